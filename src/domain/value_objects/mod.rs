pub mod evaluation;
pub mod moment;
pub mod op_key;
pub mod range;

pub use evaluation::EvalResult;
pub use moment::{Moment, MomentError, TimeComponent, DURATION_COMPONENTS};
pub use op_key::{notify_key, OpKey, OpKeyParseError};
pub use range::{NumericRange, RangeParseError, RangePosition};
