use std::fmt::{self, Display, Formatter};
use vmhandles_types::{MethodSignature, TypeDescription, TypeError};
use vmhandles_utils::atomic::MemoryOrder;

/// The update an access mode performs, independent of its ordering.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ModeOp {
    Get,
    Set,
    CompareAndSet,
    WeakCompareAndSet,
    CompareAndExchange,
    GetAndSet,
    GetAndAdd,
    GetAndBitwiseOr,
    GetAndBitwiseAnd,
    GetAndBitwiseXor,
}

impl ModeOp {
    pub fn is_numeric_update(self) -> bool {
        self == ModeOp::GetAndAdd
    }

    pub fn is_bitwise_update(self) -> bool {
        matches!(
            self,
            ModeOp::GetAndBitwiseOr | ModeOp::GetAndBitwiseAnd | ModeOp::GetAndBitwiseXor
        )
    }
}

/// Call shape shared by every access mode of the same kind.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum AccessType {
    /// `(coordinates) -> T`
    Get,
    /// `(coordinates, T) -> void`
    Set,
    /// `(coordinates, T, T) -> boolean`
    CompareAndSet,
    /// `(coordinates, T, T) -> T`
    CompareAndExchange,
    /// `(coordinates, T) -> T`
    GetAndUpdate,
}

impl AccessType {
    pub const ALL: [AccessType; 5] = [
        AccessType::Get,
        AccessType::Set,
        AccessType::CompareAndSet,
        AccessType::CompareAndExchange,
        AccessType::GetAndUpdate,
    ];

    pub fn ordinal(self) -> usize {
        self as usize
    }

    pub fn signature(
        self,
        var_type: &TypeDescription,
        coordinates: &[TypeDescription],
    ) -> Result<MethodSignature, TypeError> {
        let (trailing, return_type) = match self {
            AccessType::Get => (0, var_type.clone()),
            AccessType::Set => (1, TypeDescription::Void),
            AccessType::CompareAndSet => (2, TypeDescription::BOOLEAN),
            AccessType::CompareAndExchange => (2, var_type.clone()),
            AccessType::GetAndUpdate => (1, var_type.clone()),
        };
        let parameters = coordinates
            .iter()
            .cloned()
            .chain(std::iter::repeat(var_type.clone()).take(trailing));
        MethodSignature::new(return_type, parameters)
    }
}

macro_rules! access_modes {
    ($($variant:ident => $method:literal, $op:ident, $order:ident;)*) => {
        /// Every access mode, in declaration order.
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum AccessMode {
            $($variant),*
        }

        impl AccessMode {
            pub const ALL: [AccessMode; access_modes!(@count $($variant)*)] =
                [$(AccessMode::$variant),*];

            /// Name of the access method, e.g. `getAndAddRelease`.
            pub fn method_name(self) -> &'static str {
                match self {
                    $(AccessMode::$variant => $method),*
                }
            }

            pub fn op(self) -> ModeOp {
                match self {
                    $(AccessMode::$variant => ModeOp::$op),*
                }
            }

            pub fn order(self) -> MemoryOrder {
                match self {
                    $(AccessMode::$variant => MemoryOrder::$order),*
                }
            }
        }
    };
    (@count) => { 0 };
    (@count $head:ident $($tail:ident)*) => { 1 + access_modes!(@count $($tail)*) };
}

access_modes! {
    Get => "get", Get, Plain;
    Set => "set", Set, Plain;
    GetVolatile => "getVolatile", Get, Volatile;
    SetVolatile => "setVolatile", Set, Volatile;
    GetAcquire => "getAcquire", Get, Acquire;
    SetRelease => "setRelease", Set, Release;
    GetOpaque => "getOpaque", Get, Opaque;
    SetOpaque => "setOpaque", Set, Opaque;
    CompareAndSet => "compareAndSet", CompareAndSet, Volatile;
    CompareAndExchange => "compareAndExchange", CompareAndExchange, Volatile;
    CompareAndExchangeAcquire => "compareAndExchangeAcquire", CompareAndExchange, Acquire;
    CompareAndExchangeRelease => "compareAndExchangeRelease", CompareAndExchange, Release;
    WeakCompareAndSetPlain => "weakCompareAndSetPlain", WeakCompareAndSet, Plain;
    WeakCompareAndSet => "weakCompareAndSet", WeakCompareAndSet, Volatile;
    WeakCompareAndSetAcquire => "weakCompareAndSetAcquire", WeakCompareAndSet, Acquire;
    WeakCompareAndSetRelease => "weakCompareAndSetRelease", WeakCompareAndSet, Release;
    GetAndSet => "getAndSet", GetAndSet, Volatile;
    GetAndSetAcquire => "getAndSetAcquire", GetAndSet, Acquire;
    GetAndSetRelease => "getAndSetRelease", GetAndSet, Release;
    GetAndAdd => "getAndAdd", GetAndAdd, Volatile;
    GetAndAddAcquire => "getAndAddAcquire", GetAndAdd, Acquire;
    GetAndAddRelease => "getAndAddRelease", GetAndAdd, Release;
    GetAndBitwiseOr => "getAndBitwiseOr", GetAndBitwiseOr, Volatile;
    GetAndBitwiseOrRelease => "getAndBitwiseOrRelease", GetAndBitwiseOr, Release;
    GetAndBitwiseOrAcquire => "getAndBitwiseOrAcquire", GetAndBitwiseOr, Acquire;
    GetAndBitwiseAnd => "getAndBitwiseAnd", GetAndBitwiseAnd, Volatile;
    GetAndBitwiseAndRelease => "getAndBitwiseAndRelease", GetAndBitwiseAnd, Release;
    GetAndBitwiseAndAcquire => "getAndBitwiseAndAcquire", GetAndBitwiseAnd, Acquire;
    GetAndBitwiseXor => "getAndBitwiseXor", GetAndBitwiseXor, Volatile;
    GetAndBitwiseXorRelease => "getAndBitwiseXorRelease", GetAndBitwiseXor, Release;
    GetAndBitwiseXorAcquire => "getAndBitwiseXorAcquire", GetAndBitwiseXor, Acquire;
}

impl AccessMode {
    pub fn from_method_name(name: &str) -> Option<AccessMode> {
        Self::ALL.into_iter().find(|m| m.method_name() == name)
    }

    pub fn ordinal(self) -> usize {
        self as usize
    }

    pub fn access_type(self) -> AccessType {
        match self.op() {
            ModeOp::Get => AccessType::Get,
            ModeOp::Set => AccessType::Set,
            ModeOp::CompareAndSet | ModeOp::WeakCompareAndSet => AccessType::CompareAndSet,
            ModeOp::CompareAndExchange => AccessType::CompareAndExchange,
            _ => AccessType::GetAndUpdate,
        }
    }

    pub fn is_weak(self) -> bool {
        self.op() == ModeOp::WeakCompareAndSet
    }

    /// Whether the mode can write to the variable.
    pub fn is_mutating(self) -> bool {
        self.op() != ModeOp::Get
    }
}

impl Display for AccessMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.method_name())
    }
}
