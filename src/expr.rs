//! Output-expression language.
//!
//! Output values may be computed from the current input combination through a
//! small expression language instead of a constant. The only variable is the
//! input bit vector `i`: exactly `input_w` bits, zero padded on the high
//! side, indexed most significant bit first (`i[0]` is the top bit of the
//! input bus). Supported forms:
//!
//! - integer literals: decimal, `0x..`, `0o..`, `0b..`
//! - bit indexing: `i[k]` with a literal index `k < input_w`
//! - unary `~`, `!`, `-`
//! - binary `* / % + - << >> & ^ | == != < <= > >= && ||` with conventional
//!   precedence and parentheses
//!
//! Comparisons and logical operators yield 0 or 1. Arithmetic wraps at 64
//! bits; shifting by 64 or more yields 0. An expression is parsed once per
//! state record and then evaluated once per input combination.

use std::fmt;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExprError {
    #[error("unexpected character {ch:?} at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },

    #[error("unexpected token `{0}`")]
    UnexpectedToken(String),

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("invalid integer literal `{0}`")]
    BadLiteral(String),

    #[error("bit index {index} out of range for {width}-bit input vector")]
    IndexOutOfRange { index: u64, width: u32 },

    #[error("division by zero")]
    DivisionByZero,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    /// `~`, bitwise complement.
    Not,
    /// `!`, logical negation (0 becomes 1, anything else becomes 0).
    LogicalNot,
    /// `-`, two's-complement negation (wrapping).
    Neg,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Mul,
    Div,
    Rem,
    Add,
    Sub,
    Shl,
    Shr,
    BitAnd,
    BitXor,
    BitOr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    LogicalAnd,
    LogicalOr,
}

impl BinaryOp {
    /// Binding strength; higher binds tighter.
    fn precedence(self) -> u8 {
        use BinaryOp::*;
        match self {
            LogicalOr => 1,
            LogicalAnd => 2,
            Eq | Ne | Lt | Le | Gt | Ge => 3,
            BitOr => 4,
            BitXor => 5,
            BitAnd => 6,
            Shl | Shr => 7,
            Add | Sub => 8,
            Mul | Div | Rem => 9,
        }
    }
}

/// A parsed output expression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expr {
    Const(u64),
    /// `i[k]`: bit `input_w - 1 - k` of the input combination.
    Bit(u32),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Parse `src` against an `input_w`-bit input vector.
    ///
    /// Bit indices are checked here, not during evaluation, so a
    /// well-parsed expression can only fail at runtime on division by zero.
    pub fn parse(src: &str, input_w: u32) -> Result<Self, ExprError> {
        let tokens = lex(src)?;
        let mut parser = Parser {
            tokens: &tokens,
            pos: 0,
            input_w,
        };
        let expr = parser.parse_binary(0)?;
        match parser.peek() {
            None => Ok(expr),
            Some(t) => Err(ExprError::UnexpectedToken(t.to_string())),
        }
    }

    /// Evaluate against one input combination of `input_w` bits.
    pub fn eval(&self, input: u64, input_w: u32) -> Result<u64, ExprError> {
        Ok(match self {
            Expr::Const(v) => *v,
            Expr::Bit(k) => input >> (input_w - 1 - k) & 1,
            Expr::Unary(op, e) => {
                let v = e.eval(input, input_w)?;
                match op {
                    UnaryOp::Not => !v,
                    UnaryOp::LogicalNot => (v == 0) as u64,
                    UnaryOp::Neg => v.wrapping_neg(),
                }
            }
            Expr::Binary(op, lhs, rhs) => {
                use BinaryOp::*;
                // Short-circuit forms first; everything else is strict.
                match op {
                    LogicalAnd => {
                        return Ok(
                            (lhs.eval(input, input_w)? != 0 && rhs.eval(input, input_w)? != 0)
                                as u64,
                        )
                    }
                    LogicalOr => {
                        return Ok(
                            (lhs.eval(input, input_w)? != 0 || rhs.eval(input, input_w)? != 0)
                                as u64,
                        )
                    }
                    _ => {}
                }
                let l = lhs.eval(input, input_w)?;
                let r = rhs.eval(input, input_w)?;
                match op {
                    Mul => l.wrapping_mul(r),
                    Div => l.checked_div(r).ok_or(ExprError::DivisionByZero)?,
                    Rem => l.checked_rem(r).ok_or(ExprError::DivisionByZero)?,
                    Add => l.wrapping_add(r),
                    Sub => l.wrapping_sub(r),
                    Shl => l.checked_shl(r.min(u64::BITS as u64) as u32).unwrap_or(0),
                    Shr => l.checked_shr(r.min(u64::BITS as u64) as u32).unwrap_or(0),
                    BitAnd => l & r,
                    BitXor => l ^ r,
                    BitOr => l | r,
                    Eq => (l == r) as u64,
                    Ne => (l != r) as u64,
                    Lt => (l < r) as u64,
                    Le => (l <= r) as u64,
                    Gt => (l > r) as u64,
                    Ge => (l >= r) as u64,
                    LogicalAnd | LogicalOr => unreachable!(),
                }
            }
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Token {
    Int(u64),
    /// The input vector identifier `i`.
    Input,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Op(BinaryOp),
    Tilde,
    Bang,
    Minus,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use BinaryOp::*;
        let s = match self {
            Token::Int(v) => return write!(f, "{v}"),
            Token::Input => "i",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::LBracket => "[",
            Token::RBracket => "]",
            Token::Tilde => "~",
            Token::Bang => "!",
            Token::Minus => "-",
            Token::Op(op) => match op {
                Mul => "*",
                Div => "/",
                Rem => "%",
                Add => "+",
                Sub => "-",
                Shl => "<<",
                Shr => ">>",
                BitAnd => "&",
                BitXor => "^",
                BitOr => "|",
                Eq => "==",
                Ne => "!=",
                Lt => "<",
                Le => "<=",
                Gt => ">",
                Ge => ">=",
                LogicalAnd => "&&",
                LogicalOr => "||",
            },
        };
        f.write_str(s)
    }
}

fn lex(src: &str) -> Result<Vec<Token>, ExprError> {
    let mut tokens = Vec::new();
    let mut chars = src.char_indices().peekable();

    while let Some(&(offset, ch)) = chars.peek() {
        match ch {
            c if c.is_whitespace() => {
                chars.next();
            }
            '0'..='9' => {
                let mut digits = String::new();
                let mut radix = 10;
                chars.next();
                if ch == '0' {
                    match chars.peek().map(|&(_, c)| c) {
                        Some('x') | Some('X') => {
                            radix = 16;
                            chars.next();
                        }
                        Some('o') | Some('O') => {
                            radix = 8;
                            chars.next();
                        }
                        Some('b') | Some('B') => {
                            radix = 2;
                            chars.next();
                        }
                        _ => digits.push('0'),
                    }
                } else {
                    digits.push(ch);
                }
                while let Some(&(_, c)) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        digits.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let cleaned = digits.replace('_', "");
                let value = u64::from_str_radix(&cleaned, radix)
                    .map_err(|_| ExprError::BadLiteral(digits.clone()))?;
                tokens.push(Token::Int(value));
            }
            'i' => {
                chars.next();
                tokens.push(Token::Input);
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '[' => {
                chars.next();
                tokens.push(Token::LBracket);
            }
            ']' => {
                chars.next();
                tokens.push(Token::RBracket);
            }
            '~' => {
                chars.next();
                tokens.push(Token::Tilde);
            }
            '*' => {
                chars.next();
                tokens.push(Token::Op(BinaryOp::Mul));
            }
            '/' => {
                chars.next();
                tokens.push(Token::Op(BinaryOp::Div));
            }
            '%' => {
                chars.next();
                tokens.push(Token::Op(BinaryOp::Rem));
            }
            '+' => {
                chars.next();
                tokens.push(Token::Op(BinaryOp::Add));
            }
            '-' => {
                chars.next();
                tokens.push(Token::Minus);
            }
            '^' => {
                chars.next();
                tokens.push(Token::Op(BinaryOp::BitXor));
            }
            '&' => {
                chars.next();
                if matches!(chars.peek(), Some(&(_, '&'))) {
                    chars.next();
                    tokens.push(Token::Op(BinaryOp::LogicalAnd));
                } else {
                    tokens.push(Token::Op(BinaryOp::BitAnd));
                }
            }
            '|' => {
                chars.next();
                if matches!(chars.peek(), Some(&(_, '|'))) {
                    chars.next();
                    tokens.push(Token::Op(BinaryOp::LogicalOr));
                } else {
                    tokens.push(Token::Op(BinaryOp::BitOr));
                }
            }
            '<' => {
                chars.next();
                match chars.peek().map(|&(_, c)| c) {
                    Some('<') => {
                        chars.next();
                        tokens.push(Token::Op(BinaryOp::Shl));
                    }
                    Some('=') => {
                        chars.next();
                        tokens.push(Token::Op(BinaryOp::Le));
                    }
                    _ => tokens.push(Token::Op(BinaryOp::Lt)),
                }
            }
            '>' => {
                chars.next();
                match chars.peek().map(|&(_, c)| c) {
                    Some('>') => {
                        chars.next();
                        tokens.push(Token::Op(BinaryOp::Shr));
                    }
                    Some('=') => {
                        chars.next();
                        tokens.push(Token::Op(BinaryOp::Ge));
                    }
                    _ => tokens.push(Token::Op(BinaryOp::Gt)),
                }
            }
            '=' => {
                chars.next();
                if matches!(chars.peek(), Some(&(_, '='))) {
                    chars.next();
                    tokens.push(Token::Op(BinaryOp::Eq));
                } else {
                    return Err(ExprError::UnexpectedChar { ch: '=', offset });
                }
            }
            '!' => {
                chars.next();
                if matches!(chars.peek(), Some(&(_, '='))) {
                    chars.next();
                    tokens.push(Token::Op(BinaryOp::Ne));
                } else {
                    tokens.push(Token::Bang);
                }
            }
            other => return Err(ExprError::UnexpectedChar { ch: other, offset }),
        }
    }

    Ok(tokens)
}

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    input_w: u32,
}

impl<'t> Parser<'t> {
    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Result<&'t Token, ExprError> {
        let t = self.tokens.get(self.pos).ok_or(ExprError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(t)
    }

    fn expect(&mut self, token: Token) -> Result<(), ExprError> {
        let t = self.next()?;
        if *t == token {
            Ok(())
        } else {
            Err(ExprError::UnexpectedToken(t.to_string()))
        }
    }

    /// Precedence-climbing parse of binary operator chains.
    fn parse_binary(&mut self, min_prec: u8) -> Result<Expr, ExprError> {
        let mut lhs = self.parse_unary()?;

        while let Some(token) = self.peek() {
            let op = match token {
                Token::Op(op) => *op,
                Token::Minus => BinaryOp::Sub,
                _ => break,
            };
            let prec = op.precedence();
            if prec < min_prec {
                break;
            }
            self.pos += 1;
            // Left associative: the right operand only takes tighter binders.
            let rhs = self.parse_binary(prec + 1)?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }

        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, ExprError> {
        let op = match self.peek() {
            Some(Token::Tilde) => Some(UnaryOp::Not),
            Some(Token::Bang) => Some(UnaryOp::LogicalNot),
            Some(Token::Minus) => Some(UnaryOp::Neg),
            _ => None,
        };
        if let Some(op) = op {
            self.pos += 1;
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary(op, Box::new(operand)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, ExprError> {
        match self.next()? {
            Token::Int(v) => Ok(Expr::Const(*v)),
            Token::Input => {
                self.expect(Token::LBracket)?;
                let index = match self.next()? {
                    Token::Int(v) => *v,
                    t => return Err(ExprError::UnexpectedToken(t.to_string())),
                };
                self.expect(Token::RBracket)?;
                if index >= u64::from(self.input_w) {
                    return Err(ExprError::IndexOutOfRange {
                        index,
                        width: self.input_w,
                    });
                }
                Ok(Expr::Bit(index as u32))
            }
            Token::LParen => {
                let inner = self.parse_binary(0)?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            t => Err(ExprError::UnexpectedToken(t.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(src: &str, input: u64, input_w: u32) -> u64 {
        Expr::parse(src, input_w)
            .unwrap()
            .eval(input, input_w)
            .unwrap()
    }

    #[test]
    fn literals() {
        assert_eq!(eval("42", 0, 1), 42);
        assert_eq!(eval("0x1f", 0, 1), 31);
        assert_eq!(eval("0b1010", 0, 1), 10);
        assert_eq!(eval("0o17", 0, 1), 15);
        assert_eq!(eval("1_000", 0, 1), 1000);
    }

    #[test]
    fn bit_indexing_is_msb_first() {
        // input_w = 4, input = 0b1010: i[0] is the top bit.
        assert_eq!(eval("i[0]", 0b1010, 4), 1);
        assert_eq!(eval("i[1]", 0b1010, 4), 0);
        assert_eq!(eval("i[2]", 0b1010, 4), 1);
        assert_eq!(eval("i[3]", 0b1010, 4), 0);
    }

    #[test]
    fn leading_zeros_are_stable() {
        // A small combination still has all input_w bits addressable.
        assert_eq!(eval("i[0]", 0b0001, 4), 0);
        assert_eq!(eval("i[3]", 0b0001, 4), 1);
        assert_eq!(eval("i[0]", 0, 4), 0);
    }

    #[test]
    fn docstring_example() {
        // `2 | (i[1] & i[0])` produces binary `1x` where x is the AND of the
        // two input bits.
        for input in 0..4u64 {
            let and = (input >> 1 & 1) & (input & 1);
            assert_eq!(eval("2 | (i[1] & i[0])", input, 2), 2 | and);
        }
    }

    #[test]
    fn precedence() {
        assert_eq!(eval("1 + 2 * 3", 0, 1), 7);
        assert_eq!(eval("(1 + 2) * 3", 0, 1), 9);
        assert_eq!(eval("1 | 2 & 3", 0, 1), 3);
        assert_eq!(eval("1 << 2 + 1", 0, 1), 8);
        assert_eq!(eval("6 - 2 - 1", 0, 1), 3);
        assert_eq!(eval("1 + 1 == 2", 0, 1), 1);
        assert_eq!(eval("0 || 1 && 0", 0, 1), 0);
    }

    #[test]
    fn unary_operators() {
        assert_eq!(eval("~0", 0, 1), u64::MAX);
        assert_eq!(eval("!0", 0, 1), 1);
        assert_eq!(eval("!3", 0, 1), 0);
        assert_eq!(eval("-1 + 2", 0, 1), 1);
        assert_eq!(eval("~~5", 0, 1), 5);
    }

    #[test]
    fn wrapping_and_shift_saturation() {
        assert_eq!(eval("0 - 1", 0, 1), u64::MAX);
        assert_eq!(eval("1 << 64", 0, 1), 0);
        assert_eq!(eval("1 << 200", 0, 1), 0);
    }

    #[test]
    fn division_by_zero_is_an_eval_error() {
        let e = Expr::parse("1 / (i[0] - i[0])", 2).unwrap();
        assert!(matches!(e.eval(0, 2), Err(ExprError::DivisionByZero)));
        let e = Expr::parse("1 % 0", 2).unwrap();
        assert!(matches!(e.eval(0, 2), Err(ExprError::DivisionByZero)));
    }

    #[test]
    fn out_of_range_index_fails_at_parse() {
        assert!(matches!(
            Expr::parse("i[2]", 2),
            Err(ExprError::IndexOutOfRange { index: 2, width: 2 })
        ));
        assert!(Expr::parse("i[1]", 2).is_ok());
    }

    #[test]
    fn parse_errors() {
        assert!(matches!(Expr::parse("1 +", 1), Err(ExprError::UnexpectedEnd)));
        assert!(Expr::parse("(1", 1).is_err());
        assert!(Expr::parse("1 2", 1).is_err());
        assert!(Expr::parse("i[", 1).is_err());
        assert!(Expr::parse("i 0", 1).is_err());
        assert!(Expr::parse("$", 1).is_err());
        assert!(Expr::parse("1 = 1", 1).is_err());
    }
}
