//! Recursive-descent parser for the circuit DSL.

use super::ast::*;
use super::lexer::{Keyword, Token, TokenKind};
use super::units::{Literal, Unit};
use crate::components::ComponentKind;
use crate::error::{Position, SyntaxError};

type ParseResult<T> = Result<T, SyntaxError>;

/// Parse a token stream into a [`Program`].
///
/// The first grammar violation aborts parsing.
pub fn parse(tokens: &[Token]) -> ParseResult<Program> {
    Parser::new(tokens).parse_program()
}

/// Parser over an already tokenized source.
pub struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    /// Returned once the slice is exhausted, in case it lacks a trailing EOF
    eof: Token,
}

impl<'a> Parser<'a> {
    /// Create a parser positioned at the first token.
    pub fn new(tokens: &'a [Token]) -> Self {
        let position = tokens
            .last()
            .map(|t| t.position)
            .unwrap_or(Position::new(1, 1));
        Self {
            tokens,
            pos: 0,
            eof: Token {
                kind: TokenKind::Eof,
                text: String::new(),
                value: None,
                position,
            },
        }
    }

    /// Parse the whole token stream.
    pub fn parse_program(&mut self) -> ParseResult<Program> {
        let mut statements = Vec::new();
        while self.current().kind != TokenKind::Eof {
            statements.push(self.parse_statement()?);
        }
        Ok(Program { statements })
    }

    fn current(&self) -> &Token {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        self.tokens.get(self.pos + offset).unwrap_or(&self.eof)
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.current().kind == kind
    }

    fn error(&self, expected: impl Into<String>) -> SyntaxError {
        let found = self.current();
        SyntaxError::new(found.position, expected, found.describe())
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> ParseResult<Token> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            Err(self.error(expected))
        }
    }

    fn expect_identifier(&mut self, expected: &str) -> ParseResult<Token> {
        self.expect(TokenKind::Identifier, expected)
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> ParseResult<Token> {
        self.expect(TokenKind::Keyword(keyword), &format!("'{}'", keyword))
    }

    /// Consume an optional trailing `;` after a block.
    fn skip_optional_semicolon(&mut self) {
        if self.check(&TokenKind::Semicolon) {
            self.advance();
        }
    }

    fn parse_statement(&mut self) -> ParseResult<Statement> {
        let kind = self.current().kind.clone();
        match kind {
            TokenKind::Keyword(Keyword::Connect) => self.parse_connect().map(Statement::Connect),
            TokenKind::Keyword(Keyword::Subcircuit) => {
                self.parse_subcircuit_def().map(Statement::SubcircuitDef)
            }
            TokenKind::Keyword(Keyword::Simulate) => {
                self.parse_simulate().map(Statement::Simulate)
            }
            TokenKind::Identifier => match ComponentKind::from_type_name(&self.current().text) {
                Some(kind) => self.parse_component(kind).map(Statement::Component),
                None => self.parse_instance().map(Statement::SubcircuitInstance),
            },
            _ => Err(self.error("statement")),
        }
    }

    // ============ Components ============

    /// `TypeName Ident "(" paramList? ")" ";"`
    fn parse_component(&mut self, kind: ComponentKind) -> ParseResult<ComponentDecl> {
        let position = self.advance().position;
        let id = self.expect_identifier("component id")?.text;
        let params = if self.check(&TokenKind::OpenParen) {
            self.parse_param_list()?
        } else {
            ParamList::Positional(Vec::new())
        };
        self.expect(TokenKind::Semicolon, "';'")?;
        Ok(ComponentDecl {
            kind,
            id,
            params,
            position,
        })
    }

    fn parse_param_list(&mut self) -> ParseResult<ParamList> {
        self.expect(TokenKind::OpenParen, "'('")?;
        if self.check(&TokenKind::CloseParen) {
            self.advance();
            return Ok(ParamList::Positional(Vec::new()));
        }

        let named = self.current().kind == TokenKind::Identifier
            && self.peek_at(1).kind == TokenKind::Equals;
        let params = if named {
            let mut params = vec![self.parse_named_param()?];
            while self.check(&TokenKind::Comma) {
                self.advance();
                if self.current().kind != TokenKind::Identifier {
                    return Err(self.error("named parameter (styles cannot be mixed)"));
                }
                params.push(self.parse_named_param()?);
            }
            ParamList::Named(params)
        } else {
            let mut params = vec![self.parse_literal()?];
            while self.check(&TokenKind::Comma) {
                self.advance();
                if self.current().kind == TokenKind::Identifier {
                    return Err(self.error("positional value (styles cannot be mixed)"));
                }
                params.push(self.parse_literal()?);
            }
            ParamList::Positional(params)
        };
        self.expect(TokenKind::CloseParen, "')'")?;
        Ok(params)
    }

    fn parse_named_param(&mut self) -> ParseResult<NamedParam> {
        let name = self.expect_identifier("parameter name")?;
        self.expect(TokenKind::Equals, "'='")?;
        let value = self.parse_literal()?;
        Ok(NamedParam {
            name: name.text,
            value,
            position: name.position,
        })
    }

    /// `Number Unit?` with the unit's prefix folded into the value.
    fn parse_literal(&mut self) -> ParseResult<Literal> {
        let number = self.expect(TokenKind::Number, "number")?;
        let mut value = number.value.unwrap_or_default();
        let mut unit = None;
        if let TokenKind::Unit(u) = self.current().kind {
            let token = self.advance();
            value *= token.value.unwrap_or(1.0);
            unit = Some(u);
        }
        Ok(Literal::new(value, unit))
    }

    // ============ Connections ============

    /// `"Connect" "(" endpoint ("," endpoint)+ ")" ";"`
    fn parse_connect(&mut self) -> ParseResult<Connect> {
        let position = self.expect_keyword(Keyword::Connect)?.position;
        self.expect(TokenKind::OpenParen, "'('")?;
        let mut endpoints = vec![self.parse_endpoint()?];
        while self.check(&TokenKind::Comma) {
            self.advance();
            endpoints.push(self.parse_endpoint()?);
        }
        if endpoints.len() < 2 {
            return Err(self.error("',' and a second endpoint"));
        }
        self.expect(TokenKind::CloseParen, "')'")?;
        self.expect(TokenKind::Semicolon, "';'")?;
        Ok(Connect {
            endpoints,
            position,
        })
    }

    /// `Ident ("." Ident)? | "ground"`
    fn parse_endpoint(&mut self) -> ParseResult<Endpoint> {
        if self.check(&TokenKind::Keyword(Keyword::Ground)) {
            self.advance();
            return Ok(Endpoint::Ground);
        }
        let reference = self.expect_identifier("endpoint")?.text;
        if self.check(&TokenKind::Dot) {
            self.advance();
            let terminal = self.expect_identifier("terminal name")?.text;
            Ok(Endpoint::Terminal {
                reference,
                terminal,
            })
        } else {
            Ok(Endpoint::Net(reference))
        }
    }

    // ============ Subcircuits ============

    /// `"Subcircuit" Ident "(" Ident ("," Ident)* ")" "{" statement* "}" ";"?`
    fn parse_subcircuit_def(&mut self) -> ParseResult<SubcircuitDef> {
        let position = self.expect_keyword(Keyword::Subcircuit)?.position;
        let name = self.expect_identifier("subcircuit name")?.text;

        self.expect(TokenKind::OpenParen, "'('")?;
        let mut ports = vec![self.expect_identifier("port name")?.text];
        while self.check(&TokenKind::Comma) {
            self.advance();
            ports.push(self.expect_identifier("port name")?.text);
        }
        self.expect(TokenKind::CloseParen, "')'")?;

        self.expect(TokenKind::OpenBrace, "'{'")?;
        let mut body = Vec::new();
        while !self.check(&TokenKind::CloseBrace) {
            if self.check(&TokenKind::Eof) {
                return Err(self.error("'}'"));
            }
            body.push(self.parse_statement()?);
        }
        self.advance();
        self.skip_optional_semicolon();

        Ok(SubcircuitDef {
            name,
            ports,
            body,
            position,
        })
    }

    /// Any of:
    ///
    /// ```text
    /// Name Inst(port=net, ...);
    /// Name Inst port=net ...;
    /// Name(port=net, ...);
    /// Name port=net ...;
    /// ```
    fn parse_instance(&mut self) -> ParseResult<SubcircuitInstance> {
        let definition = self.advance();
        let position = definition.position;

        let binding_follows = self.peek_at(1).kind == TokenKind::Equals;
        let id = if self.check(&TokenKind::Identifier) && !binding_follows {
            Some(self.advance().text)
        } else if self.check(&TokenKind::Identifier) || self.check(&TokenKind::OpenParen) {
            None
        } else {
            return Err(self.error("instance id or port binding"));
        };

        let mut bindings = Vec::new();
        if self.check(&TokenKind::OpenParen) {
            self.advance();
            if !self.check(&TokenKind::CloseParen) {
                bindings.push(self.parse_binding()?);
                while self.check(&TokenKind::Comma) {
                    self.advance();
                    bindings.push(self.parse_binding()?);
                }
            }
            self.expect(TokenKind::CloseParen, "')'")?;
        } else {
            while self.check(&TokenKind::Identifier) {
                bindings.push(self.parse_binding()?);
            }
        }
        self.expect(TokenKind::Semicolon, "';'")?;

        Ok(SubcircuitInstance {
            definition: definition.text,
            id,
            bindings,
            position,
        })
    }

    fn parse_binding(&mut self) -> ParseResult<PortBinding> {
        let port = self.expect_identifier("port name")?;
        self.expect(TokenKind::Equals, "'='")?;
        let net = self.parse_endpoint()?;
        Ok(PortBinding {
            port: port.text,
            net,
            position: port.position,
        })
    }

    // ============ Simulation ============

    /// `"Simulate" "{" directive* "}" ";"?`
    fn parse_simulate(&mut self) -> ParseResult<SimulateBlock> {
        let position = self.expect_keyword(Keyword::Simulate)?.position;
        self.expect(TokenKind::OpenBrace, "'{'")?;
        let mut directives = Vec::new();
        while !self.check(&TokenKind::CloseBrace) {
            directives.push(self.parse_directive()?);
        }
        self.advance();
        self.skip_optional_semicolon();
        Ok(SimulateBlock {
            directives,
            position,
        })
    }

    fn parse_directive(&mut self) -> ParseResult<Directive> {
        let keyword = match self.current().kind {
            TokenKind::Keyword(
                kw @ (Keyword::Dc | Keyword::Ac | Keyword::Transient | Keyword::Plot),
            ) => kw,
            _ => return Err(self.error("directive (dc, ac, transient, plot) or '}'")),
        };
        self.advance();

        let directive = match keyword {
            Keyword::Dc => Directive::Dc,
            Keyword::Ac => Directive::Ac(self.parse_ac_args()?),
            Keyword::Transient => {
                self.expect(TokenKind::OpenParen, "'('")?;
                let start = self.parse_scalar(Unit::Second)?;
                self.expect(TokenKind::Comma, "','")?;
                let stop = self.parse_scalar(Unit::Second)?;
                self.expect(TokenKind::Comma, "','")?;
                let step = self.parse_scalar(Unit::Second)?;
                self.expect(TokenKind::CloseParen, "')'")?;
                Directive::Transient { start, stop, step }
            }
            _ => {
                self.expect(TokenKind::OpenParen, "'('")?;
                let mut probes = vec![self.parse_probe()?];
                while self.check(&TokenKind::Comma) {
                    self.advance();
                    probes.push(self.parse_probe()?);
                }
                self.expect(TokenKind::CloseParen, "')'")?;
                Directive::Plot(probes)
            }
        };
        self.expect(TokenKind::Semicolon, "';'")?;
        Ok(directive)
    }

    /// Nothing, `(freq)` or `(kind, points, start, stop)`.
    fn parse_ac_args(&mut self) -> ParseResult<AcSweep> {
        if !self.check(&TokenKind::OpenParen) {
            return Ok(AcSweep::default());
        }
        self.advance();

        let sweep = if self.check(&TokenKind::Identifier) {
            let kind = SweepKind::from_word(&self.current().text)
                .ok_or_else(|| self.error("sweep kind (dec, oct, lin)"))?;
            self.advance();
            self.expect(TokenKind::Comma, "','")?;
            let points = self.parse_point_count()?;
            self.expect(TokenKind::Comma, "','")?;
            let start = self.parse_scalar(Unit::Hertz)?;
            self.expect(TokenKind::Comma, "','")?;
            let stop = self.parse_scalar(Unit::Hertz)?;
            AcSweep {
                kind,
                points,
                start,
                stop,
            }
        } else {
            AcSweep::single(self.parse_scalar(Unit::Hertz)?)
        };

        self.expect(TokenKind::CloseParen, "')'")?;
        Ok(sweep)
    }

    fn parse_point_count(&mut self) -> ParseResult<usize> {
        let token = self.current();
        let count = match (&token.kind, token.value) {
            (TokenKind::Number, Some(v))
                if v >= 0.0 && v.fract() == 0.0 && v < usize::MAX as f64 =>
            {
                v as usize
            }
            _ => return Err(self.error("integer point count")),
        };
        self.advance();
        Ok(count)
    }

    /// A number whose optional unit must be `unit`.
    fn parse_scalar(&mut self, unit: Unit) -> ParseResult<f64> {
        let number_position = self.current().position;
        let literal = self.parse_literal()?;
        match literal.unit {
            Some(u) if u != unit => Err(SyntaxError::new(
                number_position,
                format!("value in '{}'", unit),
                format!("unit '{}'", u),
            )),
            _ => Ok(literal.value),
        }
    }

    /// `("V" | "I") "(" ("ground" | Ident ("." Ident)*) ")"`
    fn parse_probe(&mut self) -> ParseResult<Probe> {
        let kind = match (&self.current().kind, self.current().text.as_str()) {
            (TokenKind::Identifier, "V") => ProbeKind::Voltage,
            (TokenKind::Identifier, "I") => ProbeKind::Current,
            _ => return Err(self.error("probe 'V(...)' or 'I(...)'")),
        };
        self.advance();
        self.expect(TokenKind::OpenParen, "'('")?;

        let target = if self.check(&TokenKind::Keyword(Keyword::Ground)) {
            self.advance();
            ProbeTarget::Ground
        } else {
            let mut path = vec![self.expect_identifier("net or component")?.text];
            while self.check(&TokenKind::Dot) {
                self.advance();
                path.push(self.expect_identifier("name after '.'")?.text);
            }
            ProbeTarget::Path(path)
        };

        self.expect(TokenKind::CloseParen, "')'")?;
        Ok(Probe { kind, target })
    }
}
