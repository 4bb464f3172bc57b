use crate::{TypeDescription, TypeError};
use std::{
    fmt::{self, Debug, Display, Formatter},
    sync::Arc,
};

/// Parameter types and return type of a callable.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct MethodSignature {
    parameters: Arc<[TypeDescription]>,
    return_type: TypeDescription,
}

impl MethodSignature {
    pub fn new(
        return_type: TypeDescription,
        parameters: impl IntoIterator<Item = TypeDescription>,
    ) -> Result<Self, TypeError> {
        let parameters: Arc<[TypeDescription]> = parameters.into_iter().collect();
        if parameters.iter().any(TypeDescription::is_void) {
            return Err(TypeError::VoidParameter);
        }
        Ok(Self {
            parameters,
            return_type,
        })
    }

    pub fn parameters(&self) -> &[TypeDescription] {
        &self.parameters
    }

    pub fn parameter(&self, index: usize) -> Option<&TypeDescription> {
        self.parameters.get(index)
    }

    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }

    pub fn return_type(&self) -> &TypeDescription {
        &self.return_type
    }

    /// Argument slots taken by the parameters; `long` and `double` count twice.
    pub fn arg_slots(&self) -> usize {
        self.parameters.iter().map(TypeDescription::arg_slots).sum()
    }

    fn index_error(&self, index: usize) -> TypeError {
        TypeError::ParameterIndex {
            index,
            signature: self.to_string(),
        }
    }

    pub fn change_parameter(&self, index: usize, ty: TypeDescription) -> Result<Self, TypeError> {
        if index >= self.parameters.len() {
            return Err(self.index_error(index));
        }
        let mut params = self.parameters.to_vec();
        params[index] = ty;
        Self::new(self.return_type.clone(), params)
    }

    pub fn insert_parameters(
        &self,
        index: usize,
        types: &[TypeDescription],
    ) -> Result<Self, TypeError> {
        if index > self.parameters.len() {
            return Err(self.index_error(index));
        }
        let mut params = self.parameters.to_vec();
        params.splice(index..index, types.iter().cloned());
        Self::new(self.return_type.clone(), params)
    }

    /// Removes parameters in `start..end`.
    pub fn drop_parameters(&self, start: usize, end: usize) -> Result<Self, TypeError> {
        if start > end {
            return Err(self.index_error(start));
        }
        if end > self.parameters.len() {
            return Err(self.index_error(end));
        }
        let mut params = self.parameters.to_vec();
        params.drain(start..end);
        Self::new(self.return_type.clone(), params)
    }

    pub fn change_return_type(&self, ty: TypeDescription) -> Self {
        Self {
            parameters: self.parameters.clone(),
            return_type: ty,
        }
    }
}

impl Display for MethodSignature {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, p) in self.parameters.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", p)?;
        }
        write!(f, "){}", self.return_type)
    }
}

impl Debug for MethodSignature {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}
