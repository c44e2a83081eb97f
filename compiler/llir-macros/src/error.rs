//! Declaration of diagnostic error unions.

/// Declare an error union whose members are individual diagnostic structs.
///
/// Every member is forwarded transparently, so the union renders exactly like the diagnostic it
/// wraps, and `?` converts a member into the union through the generated `From` impls.
///
/// ```
/// use llir_macros::declare_error_type;
/// use miette::Diagnostic;
/// use thiserror::Error;
///
/// #[derive(Error, Diagnostic, Debug)]
/// #[error("block {block} has no instructions")]
/// pub struct EmptyBlockError {
///     pub block: String,
/// }
///
/// declare_error_type! {
///     #[error("assembly error: {0}")]
///     pub enum AssemblyError {
///         EmptyBlock(EmptyBlockError),
///     }
/// }
///
/// let err = AssemblyError::from(EmptyBlockError {
///     block: "%6".to_owned(),
/// });
/// assert_eq!(err.to_string(), "block %6 has no instructions");
/// ```
#[macro_export]
macro_rules! declare_error_type {
    {
        #[error($msg:expr)]
        $vis:vis enum $type_name:ident {
            $(
                $(#[$meta:meta])*
                $name:ident($ty:ty),
            )*
        }
    } => {
        #[derive(thiserror::Error, miette::Diagnostic, Debug)]
        #[error($msg)]
        $vis enum $type_name {
            $(
                $(#[$meta])*
                #[error(transparent)]
                #[diagnostic(transparent)]
                $name(#[from] $ty),
            )*
        }
    }
}
