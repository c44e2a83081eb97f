use miette::Diagnostic;
use nom::bytes::complete::take_while1;
use nom::character::complete::char;
use nom::combinator::{all_consuming, rest, verify};
use nom::IResult;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum QueryError {
    #[error("failed to parse emit query '{0}'")]
    #[diagnostic(
        code(driver::invalid_query),
        help("queries take the form ir.fn.<name>")
    )]
    InvalidQuery(String),
    #[error("emit query names function @{0}, which is not defined in the module")]
    #[diagnostic(code(driver::unknown_function))]
    UnknownFunction(String),
}

/// A query for a part of the assembled module.
///
/// Dumping a whole module gets noisy quickly, so the IR emission accepts queries that select the
/// parts to print. The syntax is a namespace, a category, and the query itself:
///
/// ```text
/// query     ::= namespace DOT category DOT name
/// namespace ::= identifier
/// category  ::= identifier
/// name      ::= any
/// ```
///
/// For example, `ir.fn.factorial_req` selects the function named `factorial_req`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmitQuery {
    Ir(IrEmitQuery),
}

impl EmitQuery {
    /// Parse a list of queries.
    pub fn from_queries<S: AsRef<str>>(queries: &[S]) -> Result<Vec<Self>, QueryError> {
        queries
            .iter()
            .map(|query| {
                let query = query.as_ref();
                match all_consuming(EmitQuery::parse)(query) {
                    Ok((_, parsed)) => Ok(parsed),
                    Err(_) => Err(QueryError::InvalidQuery(query.to_owned())),
                }
            })
            .collect()
    }

    /// Parse a single query.
    fn parse(input: &str) -> IResult<&str, Self> {
        let (input, namespace) = segment(input)?;
        let (input, _) = char('.')(input)?;
        match namespace {
            "ir" => {
                let (input, query) = IrEmitQuery::parse(input)?;
                Ok((input, Self::Ir(query)))
            }
            _ => Err(nom::Err::Error(nom::error::Error::new(
                namespace,
                nom::error::ErrorKind::Tag,
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IrEmitQuery {
    /// Emit the IR for this function
    Function(String),
}

impl IrEmitQuery {
    /// Parse an `ir` namespace query.
    pub fn parse(input: &str) -> IResult<&str, Self> {
        let (input, category) = segment(input)?;
        let (input, _) = char('.')(input)?;
        match category {
            "fn" => Self::parse_function_query(input),
            _ => Err(nom::Err::Error(nom::error::Error::new(
                category,
                nom::error::ErrorKind::Tag,
            ))),
        }
    }

    /// Parse an `ir.fn` category query. Function names may contain dots, as intrinsics do.
    fn parse_function_query(input: &str) -> IResult<&str, Self> {
        let (input, name) = verify(rest, |name: &str| !name.is_empty())(input)?;
        Ok((input, Self::Function(name.to_owned())))
    }
}

fn segment(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c != '.')(input)
}

#[cfg(test)]
mod tests {
    use crate::query::{EmitQuery, IrEmitQuery, QueryError};
    use llir_macros::{assert_err, assert_matches, assert_ok};

    #[test]
    fn test_parse_ir_fn_query() {
        let query = assert_ok!(EmitQuery::from_queries(&["ir.fn.factorial_req"]));
        assert_eq!(query.len(), 1);
        let function_name =
            assert_matches!(&query[0], EmitQuery::Ir(IrEmitQuery::Function(p)) => p);
        assert_eq!(function_name, "factorial_req");
    }

    #[test]
    fn test_function_names_keep_their_dots() {
        let query = assert_ok!(EmitQuery::from_queries(&["ir.fn.llvm.memcpy.p0.p0.i64"]));
        assert_eq!(
            query,
            vec![EmitQuery::Ir(IrEmitQuery::Function(
                "llvm.memcpy.p0.p0.i64".to_owned()
            ))]
        );
    }

    #[test]
    fn test_invalid_queries_are_rejected() {
        for query in ["hir.fn.main", "ir.block.entry", "ir.fn.", "ir", ""] {
            let err = assert_err!(EmitQuery::from_queries(&[query]));
            assert_matches!(err, QueryError::InvalidQuery(q) => assert_eq!(q, query));
        }
    }
}
