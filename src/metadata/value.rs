//! Type-erased slot values and command outcomes

use std::any::{Any, TypeId};
use std::fmt;

/// A bound value of whatever type the slot declares
pub type AnyValue = Box<dyn Any + Send + Sync>;

/// Identity of a value type, captured at registration time
#[derive(Clone, Copy)]
pub struct ValueType {
    id: TypeId,
    name: &'static str,
}

impl ValueType {
    /// The value type of `T`
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Type identity
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Full type name, e.g. `alloc::vec::Vec<i32>`
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type path without generic arguments, e.g. `alloc::vec::Vec`
    pub fn family(&self) -> &'static str {
        match self.name.find('<') {
            Some(index) => &self.name[..index],
            None => self.name,
        }
    }

    /// Last segment of the family path, e.g. `Vec`
    pub fn short_family(&self) -> &'static str {
        let family = self.family();
        match family.rfind("::") {
            Some(index) => &family[index + 2..],
            None => family,
        }
    }

    /// Whether this is the value type of `T`
    pub fn is<T: Any>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl PartialEq for ValueType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ValueType {}

impl fmt::Debug for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Normalized result of a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The command finished without an explicit code
    Completed,
    /// The command returned an exit code
    ExitCode(i32),
}

impl Outcome {
    /// Process exit code for this outcome
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Completed => 0,
            Self::ExitCode(code) => code,
        }
    }
}

/// Conversion from a command's return value into an [`Outcome`]
pub trait IntoOutcome {
    /// Convert
    fn into_outcome(self) -> Outcome;
}

impl IntoOutcome for () {
    fn into_outcome(self) -> Outcome {
        Outcome::Completed
    }
}

impl IntoOutcome for i32 {
    fn into_outcome(self) -> Outcome {
        Outcome::ExitCode(self)
    }
}

impl IntoOutcome for Outcome {
    fn into_outcome(self) -> Outcome {
        self
    }
}

/// Downcasting support for API instances
pub trait AsAny: Any {
    /// Borrow as `Any`
    fn as_any(&self) -> &dyn Any;
    /// Borrow mutably as `Any`
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
