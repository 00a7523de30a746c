use logos::Logos;
use snailquote::unescape;

use crate::profile::CommentProfile;

/// Raw tokens of a directive comment body such as `#if TARGET == 'vscode'`.
#[derive(Logos, Debug, PartialEq)]
#[logos(skip r"[ \t]+")]
enum DirectiveToken {
	#[token("#if")]
	If,
	#[token("#elseif")]
	ElseIf,
	#[token("#endif")]
	EndIf,
	#[token("TARGET")]
	Target,
	#[token("==")]
	Equals,
	#[regex(r"'([^'\\]|\\.)*'")]
	#[regex(r#""([^"\\]|\\.)*""#)]
	Quoted,
}

/// A block marker recognized on a single line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
	/// `#if TARGET == '<target>'` or `#elseif TARGET == '<target>'`.
	Open { target: String, else_if: bool },
	/// `#endif`.
	End,
}

impl Directive {
	/// Recognize a directive on a full source line (without its line
	/// terminator) written with the given comment syntax.
	pub fn from_line(line: &str, profile: &CommentProfile) -> Option<Self> {
		let body = line.trim_start_matches([' ', '\t']);
		let inner = profile.inner(body.trim_end())?;
		Self::parse(inner)
	}

	/// Parse the text between the comment delimiters.
	pub fn parse(inner: &str) -> Option<Self> {
		let source = inner.trim();
		if !source.starts_with('#') {
			return None;
		}

		let mut tokens = Vec::new();
		for (token, span) in DirectiveToken::lexer(source).spanned() {
			tokens.push((token.ok()?, span));
		}

		match tokens.as_slice() {
			[(DirectiveToken::EndIf, _)] => Some(Self::End),
			[
				(keyword @ (DirectiveToken::If | DirectiveToken::ElseIf), _),
				(DirectiveToken::Target, _),
				(DirectiveToken::Equals, _),
				(DirectiveToken::Quoted, span),
			] => {
				let target = unescape(&source[span.clone()]).ok()?;
				Some(Self::Open {
					target,
					else_if: *keyword == DirectiveToken::ElseIf,
				})
			}
			_ => None,
		}
	}
}
