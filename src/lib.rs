pub use crate::diagnostics::{to_error_source, DecoyError, ErrorContext, ErrorType, SourceArc, Span};

pub mod binder;
pub mod cli;
pub mod constraint;
pub mod diagnostics;
pub mod expectation;
pub mod method;
pub mod scenario;
pub mod surrogate;
pub mod value;
pub mod verify;

/// The names most test code needs.
pub mod prelude {
    pub use crate::binder::{Arg, ArgSpec, BuilderNamespace};
    pub use crate::constraint::{Constraint, Is, List, Text};
    pub use crate::expectation::{MethodInvocation, Repeat};
    pub use crate::method::{MethodSig, PassingMode};
    pub use crate::surrogate::{Call, ExpectationHandle, Mode, Surrogate, SurrogateOptions};
    pub use crate::value::{FromValue, SlotType, Value, ValueKind};
    pub use crate::verify::VerificationReport;
    pub use crate::{DecoyError, ErrorType};
}
