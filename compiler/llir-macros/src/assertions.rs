//! Assertion macros for tests.
//!
//! The macros unwrap the expected variant and hand it back, which keeps assembler tests flat:
//!
//! - [`assert_ok!`]
//! - [`assert_err!`]
//! - [`assert_some!`]
//! - [`assert_none!`]
//! - [`assert_matches!`]

/// Assert that a `Result` is `Ok`, returning the value inside the `Ok` variant.
#[macro_export]
macro_rules! assert_ok {
    ($expr:expr) => {{
        match $expr {
            ::std::result::Result::Ok(val) => val,
            ::std::result::Result::Err(err) => {
                panic!("assertion failed: Err({:?})", err);
            }
        }
    }};
}

/// Assert that a `Result` is `Err`, returning the error inside the `Err` variant.
#[macro_export]
macro_rules! assert_err {
    ($expr:expr) => {{
        match $expr {
            ::std::result::Result::Ok(val) => {
                panic!("assertion failed: Ok({:?})", val);
            }
            ::std::result::Result::Err(err) => err,
        }
    }};
}

/// Assert that an `Option` is `Some`, returning the value inside the `Some` variant.
#[macro_export]
macro_rules! assert_some {
    ($expr:expr) => {{
        match $expr {
            ::std::option::Option::Some(val) => val,
            ::std::option::Option::None => {
                panic!("assertion failed: None");
            }
        }
    }};
}

/// Assert that an `Option` is `None`.
#[macro_export]
macro_rules! assert_none {
    ($expr:expr) => {{
        if let ::std::option::Option::Some(val) = $expr {
            panic!("assertion failed: Some({:?})", val);
        };
    }};
}

/// Assert that an expression matches a pattern, evaluating `$output` with the pattern bindings.
#[macro_export]
macro_rules! assert_matches {
    ($expr:expr, $ty:pat_param => $output:expr) => {{
        match $expr {
            $ty => $output,
            ref other => {
                panic!(
                    "assertion failed: expected {:?} to match {}",
                    other,
                    stringify!($ty)
                );
            }
        }
    }};
}

#[cfg(test)]
mod tests {
    #[derive(Debug)]
    enum Operand {
        Label(&'static str),
        Constant(i64),
    }

    #[test]
    fn test_result_assertions_unwrap() {
        let decoded: Result<u32, &str> = Ok(13);
        assert_eq!(assert_ok!(decoded), 13);
        let decoded: Result<u32, &str> = Err("userop1");
        assert_eq!(assert_err!(decoded), "userop1");
    }

    #[test]
    fn test_option_assertions_unwrap() {
        let layer: Option<&str> = Some("noundef");
        assert_eq!(assert_some!(layer), "noundef");
        let layer: Option<&str> = None;
        assert_none!(layer);
    }

    #[test]
    fn test_assert_matches_binds() {
        let operand = Operand::Label("%13");
        let name = assert_matches!(operand, Operand::Label(name) => name);
        assert_eq!(name, "%13");
    }

    #[test]
    #[should_panic]
    fn test_assert_matches_mismatch() {
        let operand = Operand::Constant(1);
        assert_matches!(operand, Operand::Label(name) => name);
    }

    #[test]
    #[should_panic]
    fn test_assert_ok_on_err() {
        let decoded: Result<u32, &str> = Err("malformed");
        assert_ok!(decoded);
    }

    #[test]
    #[should_panic]
    fn test_assert_some_on_none() {
        let layer: Option<u32> = None;
        assert_some!(layer);
    }
}
