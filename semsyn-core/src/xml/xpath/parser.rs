//! Nom parser for the path expression subset
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! expr      := and ( 'or' and )*
//! and       := equality ( 'and' equality )*
//! equality  := primary ( ( '=' | '!=' ) primary )*
//! primary   := literal | number | '(' expr ')' | function | path
//! function  := name '(' ( expr ( ',' expr )* )? ')'
//! path      := '//' steps | '/' steps? | steps
//! steps     := step ( ( '/' | '//' ) step )*
//! step      := ( '..' | '.' | '@' test | 'text()' | 'node()' | test ) predicate*
//! test      := '*' | name ( ':' ( name | '*' ) )?
//! ```

use super::PathError;
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, digit1, multispace0, satisfy},
    combinator::{all_consuming, map, map_res, not, opt, peek, recognize, value},
    error::{Error, ErrorKind},
    multi::{many0, separated_list0},
    sequence::{delimited, pair, preceded, terminated},
    IResult,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Child,
    Attribute,
    SelfNode,
    Parent,
    DescendantOrSelf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeTest {
    /// `name` or `prefix:name`; a local name of `*` matches any name in the namespace
    Name {
        prefix: Option<String>,
        local: String,
    },
    /// `*`
    Wildcard,
    /// `text()`
    Text,
    /// `node()`
    Node,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub axis: Axis,
    pub test: NodeTest,
    pub predicates: Vec<Expr>,
}

impl Step {
    fn descendant_or_self() -> Self {
        Step {
            axis: Axis::DescendantOrSelf,
            test: NodeTest::Node,
            predicates: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocationPath {
    pub absolute: bool,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Eq(Box<Expr>, Box<Expr>),
    Ne(Box<Expr>, Box<Expr>),
    Literal(String),
    Number(f64),
    Function(String, Vec<Expr>),
    Path(LocationPath),
}

// =============================================================================
// ENTRY POINT
// =============================================================================

pub(super) fn parse(source: &str) -> Result<Expr, PathError> {
    match all_consuming(delimited(multispace0, expr, multispace0))(source) {
        Ok((_, expr)) => Ok(expr),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(PathError::Syntax {
            path: source.to_string(),
            message: if e.input.is_empty() {
                "unexpected end of expression".to_string()
            } else {
                format!("unexpected input at '{}'", e.input)
            },
        }),
        Err(nom::Err::Incomplete(_)) => Err(PathError::Syntax {
            path: source.to_string(),
            message: "incomplete expression".to_string(),
        }),
    }
}

// =============================================================================
// LEXICAL HELPERS
// =============================================================================

fn ws<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.')
}

fn ncname(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        satisfy(is_name_start),
        take_while(is_name_char),
    ))(input)
}

/// A keyword operator that is not the start of a longer name
fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    ws(terminated(tag(word), not(peek(satisfy(is_name_char)))))
}

fn literal(input: &str) -> IResult<&str, String> {
    map(
        alt((
            delimited(char('\''), take_while(|c| c != '\''), char('\'')),
            delimited(char('"'), take_while(|c| c != '"'), char('"')),
        )),
        str::to_string,
    )(input)
}

fn number(input: &str) -> IResult<&str, f64> {
    map_res(
        recognize(pair(digit1, opt(pair(char('.'), digit1)))),
        str::parse::<f64>,
    )(input)
}

// =============================================================================
// EXPRESSIONS
// =============================================================================

fn expr(input: &str) -> IResult<&str, Expr> {
    let (input, first) = and_expr(input)?;
    let (input, rest) = many0(preceded(keyword("or"), and_expr))(input)?;
    Ok((
        input,
        rest.into_iter()
            .fold(first, |acc, rhs| Expr::Or(Box::new(acc), Box::new(rhs))),
    ))
}

fn and_expr(input: &str) -> IResult<&str, Expr> {
    let (input, first) = equality(input)?;
    let (input, rest) = many0(preceded(keyword("and"), equality))(input)?;
    Ok((
        input,
        rest.into_iter()
            .fold(first, |acc, rhs| Expr::And(Box::new(acc), Box::new(rhs))),
    ))
}

fn equality(input: &str) -> IResult<&str, Expr> {
    let (input, first) = primary(input)?;
    let (input, rest) = many0(pair(ws(alt((tag("!="), tag("=")))), primary))(input)?;
    Ok((
        input,
        rest.into_iter().fold(first, |acc, (op, rhs)| match op {
            "=" => Expr::Eq(Box::new(acc), Box::new(rhs)),
            _ => Expr::Ne(Box::new(acc), Box::new(rhs)),
        }),
    ))
}

fn primary(input: &str) -> IResult<&str, Expr> {
    ws(alt((
        map(literal, Expr::Literal),
        map(number, Expr::Number),
        delimited(ws(char('(')), expr, ws(char(')'))),
        function_call,
        map(location_path, Expr::Path),
    )))(input)
}

fn function_call(input: &str) -> IResult<&str, Expr> {
    let (rest, name) = terminated(ncname, ws(char('(')))(input)?;
    // text() and node() are node tests, not functions
    if name == "text" || name == "node" {
        return Err(nom::Err::Error(Error::new(input, ErrorKind::Verify)));
    }
    let (rest, args) = separated_list0(ws(char(',')), expr)(rest)?;
    let (rest, _) = ws(char(')'))(rest)?;
    Ok((rest, Expr::Function(name.to_string(), args)))
}

// =============================================================================
// LOCATION PATHS
// =============================================================================

fn location_path(input: &str) -> IResult<&str, LocationPath> {
    alt((
        map(preceded(tag("//"), relative_steps), |steps| {
            let mut all = vec![Step::descendant_or_self()];
            all.extend(steps);
            LocationPath {
                absolute: true,
                steps: all,
            }
        }),
        map(preceded(char('/'), opt(relative_steps)), |steps| LocationPath {
            absolute: true,
            steps: steps.unwrap_or_default(),
        }),
        map(relative_steps, |steps| LocationPath {
            absolute: false,
            steps,
        }),
    ))(input)
}

fn relative_steps(input: &str) -> IResult<&str, Vec<Step>> {
    let (input, first) = step(input)?;
    let (input, rest) = many0(alt((
        map(preceded(tag("//"), step), |s| vec![Step::descendant_or_self(), s]),
        map(preceded(char('/'), step), |s| vec![s]),
    )))(input)?;
    let mut steps = vec![first];
    steps.extend(rest.into_iter().flatten());
    Ok((input, steps))
}

fn step(input: &str) -> IResult<&str, Step> {
    let (input, (axis, test)) = alt((
        value((Axis::Parent, NodeTest::Node), tag("..")),
        value((Axis::SelfNode, NodeTest::Node), char('.')),
        map(preceded(char('@'), name_test), |test| (Axis::Attribute, test)),
        value((Axis::Child, NodeTest::Text), tag("text()")),
        value((Axis::Child, NodeTest::Node), tag("node()")),
        map(name_test, |test| (Axis::Child, test)),
    ))(input)?;
    let (input, predicates) = many0(predicate)(input)?;
    Ok((
        input,
        Step {
            axis,
            test,
            predicates,
        },
    ))
}

fn name_test(input: &str) -> IResult<&str, NodeTest> {
    alt((
        value(NodeTest::Wildcard, char('*')),
        map(
            pair(
                ncname,
                opt(preceded(char(':'), alt((ncname, take_while1(|c| c == '*'))))),
            ),
            |(first, second)| match second {
                Some(local) => NodeTest::Name {
                    prefix: Some(first.to_string()),
                    local: local.to_string(),
                },
                None => NodeTest::Name {
                    prefix: None,
                    local: first.to_string(),
                },
            },
        ),
    ))(input)
}

fn predicate(input: &str) -> IResult<&str, Expr> {
    delimited(char('['), ws(expr), char(']'))(input)
}
