//! The Celesta token table and lexer.
//!
//! Token kinds are a closed set. Declaration order is the lexer rule
//! order, which matters twice: longer-match wins, but on a length tie
//! the earlier rule wins, which is how keywords beat `ID`.

use cels_core::{Interner, LexError, Lexer, Sym, Token};

macro_rules! token_kinds {
    ($($variant:ident => $name:literal, $regex:literal;)*) => {
        /// Every token kind of the surface language, in rule order.
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
        pub enum TokenKind {
            $($variant,)*
        }

        impl TokenKind {
            pub const ALL: &[TokenKind] = &[$(TokenKind::$variant,)*];

            /// The stable rule name, also used in the LR(1) table file.
            pub fn name(self) -> &'static str {
                match self {
                    $(TokenKind::$variant => $name,)*
                }
            }

            pub fn regex(self) -> &'static str {
                match self {
                    $(TokenKind::$variant => $regex,)*
                }
            }
        }
    };
}

token_kinds! {
    Ws           => "WS",             "( |\t|\n|\r)+";
    Comment      => "COMMENT",        r"/\*(([^*])|(\*[^/]))*\*/";

    LiteralBool  => "LITERAL_BOOL",   "(true)|(false)";
    LiteralDec   => "LITERAL_DEC",    r"[0-9]+\.[0-9]*";
    LiteralInt   => "LITERAL_INT",    "[0-9]+";
    LiteralStr   => "LITERAL_STR",    r#""([^\\"]|(\\"))*""#;

    KwBegin      => "KW_BEGIN",       "begin";
    KwBool       => "KW_BOOL",        "bool";
    KwBreak      => "KW_BREAK",       "break";
    KwConst      => "KW_CONST",       "const";
    KwContinue   => "KW_CONTINUE",    "continue";
    KwCppInclude => "KW_CPP_INCLUDE", "cppinclude";
    KwDo         => "KW_DO",          "do";
    KwEnd        => "KW_END",         "end";
    KwElse       => "KW_ELSE",        "else";
    KwExtern     => "KW_EXTERN",      "extern";
    KwFi         => "KW_FI",          "fi";
    KwFunction   => "KW_FUNCTION",    "function";
    KwIf         => "KW_IF",          "if";
    KwImport     => "KW_IMPORT",      "import";
    KwInt        => "KW_INT",         "int";
    KwLambda     => "KW_LAMBDA",      "lambda";
    KwMultiframe => "KW_MULTIFRAME",  "multiframe";
    KwNot        => "KW_NOT",         "not";
    KwPackage    => "KW_PACKAGE",     "package";
    KwReturn     => "KW_RETURN",      "return";
    KwScope      => "KW_SCOPE",       "scope";
    KwShort      => "KW_SHORT",       "short";
    KwString     => "KW_STRING",      "string";
    KwStruct     => "KW_STRUCT",      "struct";
    KwSuspend    => "KW_SUSPEND",     "suspend";
    KwTaskStart  => "KW_TASKSTART",   "taskstart";
    KwTaskReady  => "KW_TASKREADY",   "taskready";
    KwTaskResult => "KW_TASKRESULT",  "taskresult";
    KwThen       => "KW_THEN",        "then";
    KwUint       => "KW_UINT",        "uint";
    KwUshort     => "KW_USHORT",      "ushort";
    KwVar        => "KW_VAR",         "var";
    KwVoid       => "KW_VOID",        "void";
    KwWhile      => "KW_WHILE",       "while";

    LrArrow      => "S_LRARROW",      r"\->";
    RrArrow      => "S_RRARROW",      r"=>";
    DoubleColon  => "S_DOUBLECOLON",  "::";
    Gte          => "S_GTE",          ">=";
    EqEq         => "S_EQEQ",         "==";
    Lte          => "S_LTE",          "<=";
    Neq          => "S_NEQ",          "!=";

    Ampersand    => "S_AMPERSAND",    r"\&";
    Colon        => "S_COLON",        ":";
    Comma        => "S_COMMA",        ",";
    Dot          => "S_DOT",          r"\.";
    Gt           => "S_GT",           ">";
    Equal        => "S_EQUAL",        "=";
    LBrack       => "S_LBRACK",       r"\[";
    LParen       => "S_LPAREN",       r"\(";
    Lt           => "S_LT",           "<";
    Minus        => "S_MINUS",        r"\-";
    Percent      => "S_PERCENT",      "%";
    Plus         => "S_PLUS",         r"\+";
    RBrack       => "S_RBRACK",       r"\]";
    RParen       => "S_RPAREN",       r"\)";
    Semicolon    => "S_SEMICOLON",    ";";
    Slash        => "S_SLASH",        "/";
    Star         => "S_STAR",         r"\*";

    Id           => "ID",             "[_A-Za-z][_A-Za-z0-9]*";
}

impl TokenKind {
    pub fn is_literal(self) -> bool {
        matches!(
            self,
            TokenKind::LiteralBool
                | TokenKind::LiteralDec
                | TokenKind::LiteralInt
                | TokenKind::LiteralStr
        )
    }

    pub fn is_keyword(self) -> bool {
        self.name().starts_with("KW_")
    }

    /// Dropped from the token stream after lexing.
    pub fn is_skipped(self) -> bool {
        matches!(self, TokenKind::Ws | TokenKind::Comment)
    }
}

/// The Celesta lexer: the token table compiled over the core engine,
/// plus the literal/keyword adjacency rule.
pub struct CelsLexer {
    lexer: Lexer,
    interner: Interner,
}

impl CelsLexer {
    /// Compile the full token table. The table is static, so a failure
    /// here is a bug in the table itself.
    pub fn new() -> Result<Self, cels_core::RegexError> {
        let mut interner = Interner::new();
        let mut lexer = Lexer::new();
        for kind in TokenKind::ALL {
            lexer.add_rule(interner.intern(kind.name()), kind.regex())?;
        }
        Ok(Self { lexer, interner })
    }

    /// The interner holding all token-kind names. Grammar construction
    /// reuses it so terminals share handles with token kinds.
    pub fn interner(&self) -> &Interner {
        &self.interner
    }

    pub fn kind_sym(&self, kind: TokenKind) -> Sym {
        self.interner
            .get(kind.name())
            .expect("token table interned at construction")
    }

    fn kind_of(&self, sym: Sym) -> TokenKind {
        let name = self.interner.resolve(sym);
        *TokenKind::ALL
            .iter()
            .find(|k| k.name() == name)
            .expect("token kind exists for every lexer rule")
    }

    /// Tokenize, enforce the adjacency rule, drop trivia.
    ///
    /// Two consecutive tokens that are both literals or keywords must be
    /// separated by whitespace; `7begin` must not lex as two tokens.
    pub fn parse(&self, text: &str) -> Result<Vec<Token>, LexError> {
        let tokens = self.lexer.tokenize(text)?;

        for pair in tokens.windows(2) {
            let (k1, k2) = (self.kind_of(pair[0].kind), self.kind_of(pair[1].kind));
            let clash = |a: TokenKind, b: TokenKind| {
                a.is_literal() && (b.is_literal() || b.is_keyword())
            };
            if clash(k1, k2) || clash(k2, k1) {
                return Err(LexError::Adjacency {
                    message:
                        "there must be a space between consecutive literals and/or keywords"
                            .to_owned(),
                    line: pair[1].line,
                    col: pair[1].col,
                });
            }
        }

        Ok(tokens
            .into_iter()
            .filter(|t| !self.kind_of(t.kind).is_skipped())
            .collect())
    }
}
