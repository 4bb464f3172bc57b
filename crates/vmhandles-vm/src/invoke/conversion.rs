//! Value conversions between call shapes.
//!
//! A [`ConversionPlan`] is decided once per `(from, to, explicit)` triple and
//! cached process-wide. Planning fails for conversions that are never legal;
//! conversions that depend on a runtime value (reference casts, unboxing)
//! are planned and then checked on every application.
use crate::{error::HandleError, state::SharedGlobalState};
use vmhandles_types::{builtins, ClassHandle, PrimitiveType, TypeDescription, TypeError};
use vmhandles_utils::sync::Arc;
use vmhandles_value::{StructuralError, Value};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ConversionKind {
    Identity,
    ReferenceCast,
    Widen,
    Box,
    Unbox,
    ExplicitNarrow,
    ZeroValue,
    Discard,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConversionPlan {
    Identity,
    /// Reference to reference. `checked` is false when the cast is statically
    /// known to succeed.
    ReferenceCast { target: ClassHandle, checked: bool },
    Widen { from: PrimitiveType, to: PrimitiveType },
    /// Explicit primitive cast: narrowing, or any conversion touching
    /// `boolean` (treated as a one-bit integer).
    ExplicitNarrow { from: PrimitiveType, to: PrimitiveType },
    /// Box `primitive`, after casting it to `convert_to` when the target is
    /// the wrapper of a different primitive.
    Box {
        primitive: PrimitiveType,
        convert_to: Option<PrimitiveType>,
    },
    /// Unbox and cast to `to`. `wrapper` is the statically known box type;
    /// `None` unboxes whatever box arrives at runtime. Explicit unboxing maps
    /// null to zero.
    Unbox {
        wrapper: Option<PrimitiveType>,
        to: PrimitiveType,
        explicit: bool,
    },
    /// Return only: the callee returns void, the caller wants a value.
    ZeroValue(TypeDescription),
    /// Return only: the caller wants void.
    Discard,
}

impl ConversionPlan {
    pub fn kind(&self) -> ConversionKind {
        match self {
            ConversionPlan::Identity => ConversionKind::Identity,
            ConversionPlan::ReferenceCast { .. } => ConversionKind::ReferenceCast,
            ConversionPlan::Widen { .. } => ConversionKind::Widen,
            ConversionPlan::ExplicitNarrow { .. } => ConversionKind::ExplicitNarrow,
            ConversionPlan::Box { .. } => ConversionKind::Box,
            ConversionPlan::Unbox { .. } => ConversionKind::Unbox,
            ConversionPlan::ZeroValue(_) => ConversionKind::ZeroValue,
            ConversionPlan::Discard => ConversionKind::Discard,
        }
    }

    pub fn apply(&self, value: Value) -> Result<Value, HandleError> {
        match self {
            ConversionPlan::Identity => Ok(value),
            ConversionPlan::ReferenceCast { target, checked } => {
                if let (true, Some(class)) = (*checked, value.as_ref().and_then(|r| r.class())) {
                    if !target.is_assignable_from(&class) {
                        return Err(TypeError::ClassCast {
                            from: class.name().to_string(),
                            to: target.name().to_string(),
                        }
                        .into());
                    }
                }
                Ok(value)
            }
            ConversionPlan::Widen { to, .. } | ConversionPlan::ExplicitNarrow { to, .. } => {
                cast(&value, *to)
            }
            ConversionPlan::Box {
                primitive,
                convert_to,
            } => {
                let value = match convert_to {
                    Some(p) => cast(&value, *p)?,
                    None if value.primitive_type() == Some(*primitive) => value,
                    None => return Err(mismatch(&value, &TypeDescription::Primitive(*primitive))),
                };
                Ok(Value::Ref(value.boxed()))
            }
            ConversionPlan::Unbox {
                wrapper,
                to,
                explicit,
            } => {
                let Some(reference) = value.as_ref() else {
                    return Err(mismatch(&value, &TypeDescription::object()));
                };
                if reference.is_null() {
                    if *explicit {
                        return Ok(Value::zero(&TypeDescription::Primitive(*to)));
                    }
                    return Err(StructuralError::NullReference(format!(
                        "cannot unbox null to {}",
                        to
                    ))
                    .into());
                }
                let class_cast = || {
                    HandleError::from(TypeError::ClassCast {
                        from: reference
                            .class()
                            .map(|c| c.name().to_string())
                            .unwrap_or_default(),
                        to: wrapper.map_or_else(|| to.wrapper_name(), |w| w.wrapper_name()).to_string(),
                    })
                };
                let unboxed = reference.unbox().ok_or_else(class_cast)?;
                let primitive = unboxed.primitive_type().ok_or_else(class_cast)?;
                if wrapper.is_some_and(|w| w != primitive) {
                    return Err(class_cast());
                }
                if !*explicit && primitive != *to && !primitive.widens_to(*to) {
                    return Err(class_cast());
                }
                cast(&unboxed, *to)
            }
            ConversionPlan::ZeroValue(ty) => Ok(Value::zero(ty)),
            ConversionPlan::Discard => Ok(Value::Void),
        }
    }
}

fn cast(value: &Value, to: PrimitiveType) -> Result<Value, HandleError> {
    value
        .cast_primitive(to)
        .ok_or_else(|| mismatch(value, &TypeDescription::Primitive(to)))
}

fn mismatch(value: &Value, to: &TypeDescription) -> HandleError {
    TypeError::Conversion {
        from: value.runtime_type().name(),
        to: to.name(),
    }
    .into()
}

fn impossible(from: &TypeDescription, to: &TypeDescription) -> HandleError {
    TypeError::Conversion {
        from: from.name(),
        to: to.name(),
    }
    .into()
}

/// Whether some box class can be stored where `class` is expected.
fn boxes_into(class: &ClassHandle) -> bool {
    PrimitiveType::ALL
        .into_iter()
        .any(|p| class.is_assignable_from(&builtins::wrapper(p)))
}

fn build(
    from: &TypeDescription,
    to: &TypeDescription,
    explicit: bool,
) -> Result<ConversionPlan, HandleError> {
    use TypeDescription::{Class, Primitive, Void};

    if from == to {
        return Ok(ConversionPlan::Identity);
    }
    match (from, to) {
        (Void, _) | (_, Void) => Err(impossible(from, to)),

        (Class(source), Class(target)) => Ok(ConversionPlan::ReferenceCast {
            target: target.clone(),
            checked: !target.is_assignable_from(source) && !(explicit && target.is_interface()),
        }),

        (Primitive(a), Primitive(b)) if a.widens_to(*b) => {
            Ok(ConversionPlan::Widen { from: *a, to: *b })
        }
        (Primitive(a), Primitive(b)) if explicit => {
            Ok(ConversionPlan::ExplicitNarrow { from: *a, to: *b })
        }
        (Primitive(_), Primitive(_)) => Err(impossible(from, to)),

        (Primitive(p), Class(target)) => {
            if target.is_assignable_from(&builtins::wrapper(*p)) {
                return Ok(ConversionPlan::Box {
                    primitive: *p,
                    convert_to: None,
                });
            }
            match target.wrapped_primitive() {
                Some(q) if explicit => Ok(ConversionPlan::Box {
                    primitive: *p,
                    convert_to: Some(q),
                }),
                _ => Err(impossible(from, to)),
            }
        }

        (Class(source), Primitive(q)) => match source.wrapped_primitive() {
            Some(p) if explicit || p == *q || p.widens_to(*q) => Ok(ConversionPlan::Unbox {
                wrapper: Some(p),
                to: *q,
                explicit,
            }),
            Some(_) => Err(impossible(from, to)),
            // Only an explicit cast may guess the box type of a supertype.
            None if explicit && boxes_into(source) => Ok(ConversionPlan::Unbox {
                wrapper: None,
                to: *q,
                explicit,
            }),
            None => Err(impossible(from, to)),
        },
    }
}

/// Plans the conversion of a value of type `from` into `to`.
pub fn plan_conversion(
    from: &TypeDescription,
    to: &TypeDescription,
    explicit: bool,
) -> Result<Arc<ConversionPlan>, HandleError> {
    SharedGlobalState::get().conversion_plan((from.clone(), to.clone(), explicit), || {
        build(from, to, explicit)
    })
}

/// Like [`plan_conversion`], plus the rules for void returns: a void result
/// becomes the zero value of `to`, and any result converted to void is
/// discarded.
pub fn plan_return_conversion(
    from: &TypeDescription,
    to: &TypeDescription,
    explicit: bool,
) -> Result<Arc<ConversionPlan>, HandleError> {
    match (from, to) {
        (TypeDescription::Void, TypeDescription::Void) => {
            Ok(Arc::new(ConversionPlan::Identity))
        }
        (_, TypeDescription::Void) => Ok(Arc::new(ConversionPlan::Discard)),
        (TypeDescription::Void, to) => Ok(Arc::new(ConversionPlan::ZeroValue(to.clone()))),
        _ => plan_conversion(from, to, explicit),
    }
}
