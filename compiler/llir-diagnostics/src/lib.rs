/// Abort on a state that the assembler guarantees cannot happen.
///
/// This is reserved for broken internal invariants. Anything reachable from malformed input must be
/// reported through the error types of the crate instead.
#[macro_export]
macro_rules! ice {
    ($message:expr) => {{
        let message = $message;
        let file = file!();
        let line = line!();
        let column = column!();
        panic!(
            "internal assembler error ({}:{}:{}):\n{}",
            file, line, column, message
        )
    }};
}
