//! The lexer turns the character stream into [`Token`]s, skipping whitespace
//! and `#` line comments and tracking the source location of every token's
//! first character.
//!
//! Unlike a scanner that collects all tokens up front, this lexer is a pull
//! lexer driven by the parser: [`Lexer::current`] peeks at the most recently
//! produced token, [`Lexer::advance`] produces the next one, and
//! [`Lexer::consume`] asserts the current token before advancing. The initial
//! state reports [`Token::Eof`] until the first `advance`.

mod token;

pub use token::{SourceLocation, Token};

/// The pull lexer over one source string.
pub struct Lexer<'a> {
	/// Remaining characters of the source text.
	chars:       std::str::Chars<'a>,
	/// Most recently read character, not yet part of any token. `None` once
	/// the source is exhausted. Primed with a space so the whitespace skip
	/// reads the first real character.
	last_char:   Option<char>,
	/// Most recently produced token.
	current:     Token,
	/// Location of `current`'s first character.
	current_loc: SourceLocation,
	/// Running location of `last_char`.
	lex_loc:     SourceLocation,
}

impl<'a> Lexer<'a> {
	pub fn new(source: &'a str) -> Self {
		Self {
			chars:       source.chars(),
			last_char:   Some(' '),
			current:     Token::Eof,
			current_loc: SourceLocation::start(),
			lex_loc:     SourceLocation::start(),
		}
	}

	/// The most recently produced token, without consuming it.
	pub fn current(&self) -> &Token { &self.current }

	/// Location of the current token's first character.
	pub fn current_loc(&self) -> SourceLocation { self.current_loc }

	/// Produces and returns the next token.
	pub fn advance(&mut self) -> Token {
		self.current = self.next_token();
		self.current.clone()
	}

	/// Asserts that the current token is `expected`, then advances past it.
	pub fn consume(&mut self, expected: &Token) {
		assert!(self.current == *expected, "Lexer::consume called with wrong token");
		self.advance();
	}

	/// Reads one character, keeping the running location in step. A carriage
	/// return or line feed each bump the line and reset the column.
	fn next_char(&mut self) {
		self.last_char = self.chars.next();
		match self.last_char {
			Some('\n') | Some('\r') => {
				self.lex_loc.line += 1;
				self.lex_loc.col = 0;
			}
			Some(_) => self.lex_loc.col += 1,
			None => {}
		}
	}

	fn next_token(&mut self) -> Token {
		loop {
			while matches!(self.last_char, Some(c) if c.is_ascii_whitespace()) {
				self.next_char();
			}

			self.current_loc = self.lex_loc;

			let c = match self.last_char {
				Some(c) => c,
				None => return Token::Eof,
			};

			if c.is_ascii_alphabetic() {
				return self.identifier_or_keyword();
			}
			if c.is_ascii_digit() || c == '.' {
				return self.number();
			}
			if c == '#' {
				// Comment until end of line, then go around for the next token.
				loop {
					self.next_char();
					match self.last_char {
						None => return Token::Eof,
						Some('\n') | Some('\r') => break,
						Some(_) => {}
					}
				}
				continue;
			}

			self.next_char();
			return Token::Char(c);
		}
	}

	/// Scans `[A-Za-z][A-Za-z0-9]*` and classifies it as a keyword or identifier.
	fn identifier_or_keyword(&mut self) -> Token {
		let mut word = String::new();
		while let Some(c) = self.last_char {
			if !c.is_ascii_alphanumeric() {
				break;
			}
			word.push(c);
			self.next_char();
		}
		Token::keyword_or_identifier(&word)
	}

	/// Scans `[0-9.]+`. A second decimal point in one literal is fatal.
	fn number(&mut self) -> Token {
		let mut digits = String::new();
		let mut decimals = 0;
		while let Some(c) = self.last_char {
			if !c.is_ascii_digit() && c != '.' {
				break;
			}
			if c == '.' {
				decimals += 1;
				assert!(decimals < 2, "cannot handle multiple decimals in a number");
			}
			digits.push(c);
			self.next_char();
		}
		// strtod-style: a lone '.' reads as zero.
		Token::Number(digits.parse().unwrap_or(0.0))
	}
}
