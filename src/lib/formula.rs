//! Parser for the LaTeX math subset drawn by the glyph rasterizer.
//!
//! The parser turns a formula (without `$` delimiters) into a small tree of
//! atoms, groups, scripts, fractions, radicals and accents. Whitespace is
//! ignored as in TeX math mode; unknown commands and unbalanced braces are
//! reported so the caller can fall back to plain text.

use std::fmt;

/// Spacing class of an atom, after TeX's inter-atom spacing rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtomClass {
    Ord,
    /// Large operator or named function; `limits` stacks scripts above/below.
    Op { limits: bool, large: bool },
    Bin,
    Rel,
    Open,
    Close,
    Punct,
}

/// Mark drawn above (or below) an accented base.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AccentMark {
    Glyph(char),
    Overline,
    Underline,
}

/// Parsed formula tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Atom { text: String, class: AtomClass },
    /// Upright text from `\text{..}`; spaces are kept.
    Text(String),
    Group(Vec<Node>),
    Scripts {
        base: Box<Node>,
        sup: Option<Box<Node>>,
        sub: Option<Box<Node>>,
    },
    Frac {
        num: Box<Node>,
        den: Box<Node>,
        /// Scale of numerator and denominator relative to the current size.
        scale: f32,
        bar: bool,
    },
    Sqrt {
        index: Option<Box<Node>>,
        body: Box<Node>,
    },
    Accent { base: Box<Node>, mark: AccentMark },
    /// Horizontal space in em.
    Space(f32),
}

impl Node {
    /// Class used when spacing this node against its neighbours.
    pub fn class(&self) -> Option<AtomClass> {
        match self {
            Node::Atom { class, .. } => Some(*class),
            Node::Scripts { base, .. } => base.class(),
            Node::Space(_) => None,
            _ => Some(AtomClass::Ord),
        }
    }
}

/// Reasons a formula cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormulaError {
    UnknownCommand(String),
    UnbalancedGroup,
    MissingArgument(String),
    DoubleScript(char),
    /// Groups and arguments nested deeper than [`MAX_NESTING`].
    TooDeep,
}

impl fmt::Display for FormulaError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FormulaError::UnknownCommand(name) => write!(f, "unknown command \\{}", name),
            FormulaError::UnbalancedGroup => write!(f, "unbalanced braces"),
            FormulaError::MissingArgument(what) => write!(f, "missing argument for {}", what),
            FormulaError::DoubleScript(c) => write!(f, "double {} script", c),
            FormulaError::TooDeep => write!(f, "nested deeper than {} levels", MAX_NESTING),
        }
    }
}

impl std::error::Error for FormulaError {}

/// Deepest nesting of groups, arguments and radical indices accepted.
pub const MAX_NESTING: usize = 128;

fn atom(text: &str, class: AtomClass) -> Node {
    Node::Atom {
        text: text.to_string(),
        class,
    }
}

const OP: AtomClass = AtomClass::Op {
    limits: false,
    large: false,
};
const OP_LIMITS: AtomClass = AtomClass::Op {
    limits: true,
    large: false,
};
const BIG_OP: AtomClass = AtomClass::Op {
    limits: true,
    large: true,
};
const INTEGRAL: AtomClass = AtomClass::Op {
    limits: false,
    large: true,
};

/// Glyph and class of a symbol command such as `\alpha` or `\leq`.
fn symbol_command(name: &str) -> Option<(&'static str, AtomClass)> {
    use AtomClass::*;
    let entry = match name {
        "alpha" => ("\u{3b1}", Ord),
        "beta" => ("\u{3b2}", Ord),
        "gamma" => ("\u{3b3}", Ord),
        "delta" => ("\u{3b4}", Ord),
        "epsilon" => ("\u{3f5}", Ord),
        "varepsilon" => ("\u{3b5}", Ord),
        "zeta" => ("\u{3b6}", Ord),
        "eta" => ("\u{3b7}", Ord),
        "theta" => ("\u{3b8}", Ord),
        "vartheta" => ("\u{3d1}", Ord),
        "iota" => ("\u{3b9}", Ord),
        "kappa" => ("\u{3ba}", Ord),
        "lambda" => ("\u{3bb}", Ord),
        "mu" => ("\u{3bc}", Ord),
        "nu" => ("\u{3bd}", Ord),
        "xi" => ("\u{3be}", Ord),
        "pi" => ("\u{3c0}", Ord),
        "varpi" => ("\u{3d6}", Ord),
        "rho" => ("\u{3c1}", Ord),
        "varrho" => ("\u{3f1}", Ord),
        "sigma" => ("\u{3c3}", Ord),
        "varsigma" => ("\u{3c2}", Ord),
        "tau" => ("\u{3c4}", Ord),
        "upsilon" => ("\u{3c5}", Ord),
        "phi" => ("\u{3d5}", Ord),
        "varphi" => ("\u{3c6}", Ord),
        "chi" => ("\u{3c7}", Ord),
        "psi" => ("\u{3c8}", Ord),
        "omega" => ("\u{3c9}", Ord),
        "Gamma" => ("\u{393}", Ord),
        "Delta" => ("\u{394}", Ord),
        "Theta" => ("\u{398}", Ord),
        "Lambda" => ("\u{39b}", Ord),
        "Xi" => ("\u{39e}", Ord),
        "Pi" => ("\u{3a0}", Ord),
        "Sigma" => ("\u{3a3}", Ord),
        "Upsilon" => ("\u{3a5}", Ord),
        "Phi" => ("\u{3a6}", Ord),
        "Psi" => ("\u{3a8}", Ord),
        "Omega" => ("\u{3a9}", Ord),

        "leq" => ("\u{2264}", Rel),
        "geq" => ("\u{2265}", Rel),
        "neq" | "ne" => ("\u{2260}", Rel),
        "approx" => ("\u{2248}", Rel),
        "equiv" => ("\u{2261}", Rel),
        "sim" => ("\u{223c}", Rel),
        "simeq" => ("\u{2243}", Rel),
        "cong" => ("\u{2245}", Rel),
        "propto" => ("\u{221d}", Rel),
        "ll" => ("\u{226a}", Rel),
        "gg" => ("\u{226b}", Rel),
        "in" => ("\u{2208}", Rel),
        "notin" => ("\u{2209}", Rel),
        "ni" => ("\u{220b}", Rel),
        "subset" => ("\u{2282}", Rel),
        "subseteq" => ("\u{2286}", Rel),
        "supset" => ("\u{2283}", Rel),
        "supseteq" => ("\u{2287}", Rel),
        "to" | "rightarrow" => ("\u{2192}", Rel),
        "leftarrow" | "gets" => ("\u{2190}", Rel),
        "Rightarrow" | "implies" => ("\u{21d2}", Rel),
        "Leftarrow" => ("\u{21d0}", Rel),
        "leftrightarrow" => ("\u{2194}", Rel),
        "Leftrightarrow" | "iff" => ("\u{21d4}", Rel),
        "mapsto" => ("\u{21a6}", Rel),
        "perp" => ("\u{22a5}", Rel),
        "mid" => ("|", Rel),
        "parallel" => ("\u{2225}", Rel),
        "lt" => ("<", Rel),
        "gt" => (">", Rel),

        "pm" => ("\u{b1}", Bin),
        "mp" => ("\u{2213}", Bin),
        "times" => ("\u{d7}", Bin),
        "div" => ("\u{f7}", Bin),
        "cdot" => ("\u{b7}", Bin),
        "ast" => ("\u{2217}", Bin),
        "star" => ("\u{22c6}", Bin),
        "circ" => ("\u{2218}", Bin),
        "bullet" => ("\u{2219}", Bin),
        "cup" => ("\u{222a}", Bin),
        "cap" => ("\u{2229}", Bin),
        "wedge" | "land" => ("\u{2227}", Bin),
        "vee" | "lor" => ("\u{2228}", Bin),
        "oplus" => ("\u{2295}", Bin),
        "otimes" => ("\u{2297}", Bin),
        "setminus" => ("\u{2216}", Bin),
        "bmod" => ("mod", Bin),

        "infty" => ("\u{221e}", Ord),
        "partial" => ("\u{2202}", Ord),
        "nabla" => ("\u{2207}", Ord),
        "forall" => ("\u{2200}", Ord),
        "exists" => ("\u{2203}", Ord),
        "emptyset" | "varnothing" => ("\u{2205}", Ord),
        "neg" | "lnot" => ("\u{ac}", Ord),
        "angle" => ("\u{2220}", Ord),
        "prime" => ("\u{2032}", Ord),
        "ldots" | "dots" => ("\u{2026}", Ord),
        "cdots" => ("\u{22ef}", Ord),
        "vdots" => ("\u{22ee}", Ord),
        "ddots" => ("\u{22f1}", Ord),
        "hbar" => ("\u{210f}", Ord),
        "ell" => ("\u{2113}", Ord),
        "Re" => ("\u{211c}", Ord),
        "Im" => ("\u{2111}", Ord),
        "aleph" => ("\u{2135}", Ord),
        "degree" => ("\u{b0}", Ord),
        "top" => ("\u{22a4}", Ord),
        "bot" => ("\u{22a5}", Ord),
        "triangle" => ("\u{25b3}", Ord),
        "backslash" => ("\\", Ord),

        "sum" => ("\u{2211}", BIG_OP),
        "prod" => ("\u{220f}", BIG_OP),
        "coprod" => ("\u{2210}", BIG_OP),
        "bigcup" => ("\u{22c3}", BIG_OP),
        "bigcap" => ("\u{22c2}", BIG_OP),
        "int" => ("\u{222b}", INTEGRAL),
        "iint" => ("\u{222c}", INTEGRAL),
        "iiint" => ("\u{222d}", INTEGRAL),
        "oint" => ("\u{222e}", INTEGRAL),

        "sin" => ("sin", OP),
        "cos" => ("cos", OP),
        "tan" => ("tan", OP),
        "cot" => ("cot", OP),
        "sec" => ("sec", OP),
        "csc" => ("csc", OP),
        "arcsin" => ("arcsin", OP),
        "arccos" => ("arccos", OP),
        "arctan" => ("arctan", OP),
        "sinh" => ("sinh", OP),
        "cosh" => ("cosh", OP),
        "tanh" => ("tanh", OP),
        "log" => ("log", OP),
        "ln" => ("ln", OP),
        "lg" => ("lg", OP),
        "exp" => ("exp", OP),
        "deg" => ("deg", OP),
        "dim" => ("dim", OP),
        "ker" => ("ker", OP),
        "arg" => ("arg", OP),
        "det" => ("det", OP_LIMITS),
        "gcd" => ("gcd", OP_LIMITS),
        "min" => ("min", OP_LIMITS),
        "max" => ("max", OP_LIMITS),
        "lim" => ("lim", OP_LIMITS),
        "sup" => ("sup", OP_LIMITS),
        "inf" => ("inf", OP_LIMITS),
        "Pr" => ("Pr", OP_LIMITS),
        "argmin" => ("argmin", OP_LIMITS),
        "argmax" => ("argmax", OP_LIMITS),

        "lbrace" => ("{", Open),
        "rbrace" => ("}", Close),
        "langle" => ("\u{27e8}", Open),
        "rangle" => ("\u{27e9}", Close),
        "lvert" => ("|", Open),
        "rvert" => ("|", Close),
        "vert" => ("|", Ord),
        "Vert" => ("\u{2016}", Ord),
        "lfloor" => ("\u{230a}", Open),
        "rfloor" => ("\u{230b}", Close),
        "lceil" => ("\u{2308}", Open),
        "rceil" => ("\u{2309}", Close),
        _ => return None,
    };
    Some(entry)
}

/// Width in em of the spacing commands.
fn space_command(name: &str) -> Option<f32> {
    match name {
        "," | "thinspace" => Some(3.0 / 18.0),
        ":" | ">" | "medspace" => Some(4.0 / 18.0),
        ";" | "thickspace" => Some(5.0 / 18.0),
        "!" | "negthinspace" => Some(-3.0 / 18.0),
        " " => Some(1.0 / 3.0),
        "quad" => Some(1.0),
        "qquad" => Some(2.0),
        _ => None,
    }
}

fn accent_command(name: &str) -> Option<AccentMark> {
    let mark = match name {
        "hat" | "widehat" => AccentMark::Glyph('^'),
        "tilde" | "widetilde" => AccentMark::Glyph('~'),
        "dot" => AccentMark::Glyph('\u{b7}'),
        "ddot" => AccentMark::Glyph('\u{a8}'),
        "acute" => AccentMark::Glyph('\u{b4}'),
        "grave" => AccentMark::Glyph('`'),
        "vec" => AccentMark::Glyph('\u{2192}'),
        "bar" | "overline" => AccentMark::Overline,
        "underline" => AccentMark::Underline,
        _ => return None,
    };
    Some(mark)
}

/// Class of a literal character in math mode.
fn char_class(c: char) -> AtomClass {
    match c {
        '+' | '-' | '*' => AtomClass::Bin,
        '=' | '<' | '>' | ':' => AtomClass::Rel,
        ',' | ';' => AtomClass::Punct,
        '(' | '[' => AtomClass::Open,
        ')' | ']' => AtomClass::Close,
        _ => AtomClass::Ord,
    }
}

/// Glyph drawn for a literal character.
fn char_glyph(c: char) -> String {
    match c {
        '-' => "\u{2212}".to_string(),
        '*' => "\u{2217}".to_string(),
        '\'' => "\u{2032}".to_string(),
        other => other.to_string(),
    }
}

struct FormulaParser<'a> {
    chars: Vec<char>,
    pos: usize,
    source: &'a str,
    depth: usize,
}

impl<'a> FormulaParser<'a> {
    fn new(source: &'a str, depth: usize) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            source,
            depth,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().map_or(false, char::is_whitespace) {
            self.pos += 1;
        }
    }

    /// Reads a command name after a backslash: a run of letters, or one
    /// non-letter character.
    fn command_name(&mut self) -> Result<String, FormulaError> {
        let start = self.pos;
        while self.peek().map_or(false, |c| c.is_ascii_alphabetic()) {
            self.pos += 1;
        }
        if self.pos > start {
            return Ok(self.chars[start..self.pos].iter().collect());
        }
        match self.peek() {
            Some(c) => {
                self.pos += 1;
                Ok(c.to_string())
            }
            None => Err(FormulaError::MissingArgument("\\".to_string())),
        }
    }

    /// Parses nodes until end of input, or until `}` when `in_group`.
    fn sequence(&mut self, in_group: bool) -> Result<Vec<Node>, FormulaError> {
        let mut nodes: Vec<Node> = Vec::new();
        loop {
            self.skip_whitespace();
            let Some(c) = self.peek() else {
                if in_group {
                    return Err(FormulaError::UnbalancedGroup);
                }
                return Ok(nodes);
            };
            match c {
                '}' => {
                    if in_group {
                        self.pos += 1;
                        return Ok(nodes);
                    }
                    return Err(FormulaError::UnbalancedGroup);
                }
                '^' | '_' => {
                    self.pos += 1;
                    let script = self.argument(&c.to_string())?;
                    let base = nodes.pop().unwrap_or(Node::Group(Vec::new()));
                    nodes.push(attach_script(base, c, script)?);
                }
                _ => {
                    if let Some(node) = self.item()? {
                        nodes.push(node);
                    }
                }
            }
        }
    }

    /// Parses one item: a group, a command or a literal character.
    ///
    /// Every nested construct goes through here, so the depth check bounds
    /// the recursion of the whole parser.
    fn item(&mut self) -> Result<Option<Node>, FormulaError> {
        if self.depth >= MAX_NESTING {
            return Err(FormulaError::TooDeep);
        }
        self.depth += 1;
        let parsed = self.item_at_depth();
        self.depth -= 1;
        parsed
    }

    fn item_at_depth(&mut self) -> Result<Option<Node>, FormulaError> {
        let Some(c) = self.peek() else {
            return Ok(None);
        };
        self.pos += 1;
        match c {
            '{' => Ok(Some(Node::Group(self.sequence(true)?))),
            '\\' => self.command(),
            '&' => Ok(Some(Node::Space(1.0))),
            _ => Ok(Some(atom(&char_glyph(c), char_class(c)))),
        }
    }

    /// A mandatory argument: a braced group or a single item.
    fn argument(&mut self, what: &str) -> Result<Node, FormulaError> {
        self.skip_whitespace();
        match self.peek() {
            None | Some('}') | Some('^') | Some('_') => {
                Err(FormulaError::MissingArgument(what.to_string()))
            }
            _ => self
                .item()?
                .ok_or_else(|| FormulaError::MissingArgument(what.to_string())),
        }
    }

    /// Raw text of a braced argument, for `\text{..}`.
    fn text_argument(&mut self, what: &str) -> Result<String, FormulaError> {
        self.skip_whitespace();
        if self.peek() != Some('{') {
            return Err(FormulaError::MissingArgument(what.to_string()));
        }
        self.pos += 1;
        let mut depth = 1;
        let mut text = String::new();
        while let Some(c) = self.peek() {
            self.pos += 1;
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(text);
                    }
                }
                _ => {}
            }
            text.push(c);
        }
        Err(FormulaError::UnbalancedGroup)
    }

    /// Delimiter after `\left` / `\right`; `.` yields nothing.
    fn delimiter(&mut self, what: &str, class: AtomClass) -> Result<Option<Node>, FormulaError> {
        self.skip_whitespace();
        let Some(c) = self.peek() else {
            return Err(FormulaError::MissingArgument(what.to_string()));
        };
        self.pos += 1;
        match c {
            '.' => Ok(None),
            '\\' => {
                let name = self.command_name()?;
                let glyph = match name.as_str() {
                    "{" | "lbrace" => "{",
                    "}" | "rbrace" => "}",
                    "|" | "Vert" => "\u{2016}",
                    other => match symbol_command(other) {
                        Some((glyph, _)) => glyph,
                        None => return Err(FormulaError::UnknownCommand(other.to_string())),
                    },
                };
                Ok(Some(atom(glyph, class)))
            }
            other => Ok(Some(atom(&other.to_string(), class))),
        }
    }

    fn command(&mut self) -> Result<Option<Node>, FormulaError> {
        let name = self.command_name()?;

        if let Some((glyph, class)) = symbol_command(&name) {
            return Ok(Some(atom(glyph, class)));
        }
        if let Some(em) = space_command(&name) {
            return Ok(Some(Node::Space(em)));
        }
        if let Some(mark) = accent_command(&name) {
            let base = self.argument(&name)?;
            return Ok(Some(Node::Accent {
                base: Box::new(base),
                mark,
            }));
        }

        match name.as_str() {
            "{" => Ok(Some(atom("{", AtomClass::Open))),
            "}" => Ok(Some(atom("}", AtomClass::Close))),
            "%" | "$" | "_" | "&" | "#" => Ok(Some(atom(&name, AtomClass::Ord))),
            "|" => Ok(Some(atom("\u{2016}", AtomClass::Ord))),
            "\\" => Ok(Some(Node::Space(1.0))),
            "frac" | "dfrac" | "tfrac" | "cfrac" | "binom" => {
                let num = self.argument(&name)?;
                let den = self.argument(&name)?;
                let scale = match name.as_str() {
                    "dfrac" | "cfrac" => 1.0,
                    "tfrac" => 0.75,
                    _ => 0.9,
                };
                let frac = Node::Frac {
                    num: Box::new(num),
                    den: Box::new(den),
                    scale,
                    bar: name != "binom",
                };
                if name == "binom" {
                    return Ok(Some(Node::Group(vec![
                        atom("(", AtomClass::Open),
                        frac,
                        atom(")", AtomClass::Close),
                    ])));
                }
                Ok(Some(frac))
            }
            "sqrt" => {
                self.skip_whitespace();
                let index = if self.peek() == Some('[') {
                    self.pos += 1;
                    let start = self.pos;
                    while self.peek().map_or(false, |c| c != ']') {
                        self.pos += 1;
                    }
                    if self.peek().is_none() {
                        return Err(FormulaError::UnbalancedGroup);
                    }
                    let inner: String = self.chars[start..self.pos].iter().collect();
                    self.pos += 1;
                    let mut index = FormulaParser::new(&inner, self.depth);
                    Some(Box::new(Node::Group(index.sequence(false)?)))
                } else {
                    None
                };
                let body = self.argument("sqrt")?;
                Ok(Some(Node::Sqrt {
                    index,
                    body: Box::new(body),
                }))
            }
            "text" | "textrm" | "textbf" | "textit" | "mbox" => {
                Ok(Some(Node::Text(self.text_argument(&name)?)))
            }
            "operatorname" => {
                let text = self.text_argument(&name)?;
                Ok(Some(Node::Atom { text, class: OP }))
            }
            "mathrm" | "mathbf" | "mathit" | "mathsf" | "mathtt" | "mathcal" | "boldsymbol"
            | "bm" | "mathbb" => {
                let inner = self.argument(&name)?;
                if name == "mathbb" {
                    return Ok(Some(double_struck(inner)));
                }
                Ok(Some(inner))
            }
            "left" => self.delimiter("left", AtomClass::Open),
            "right" => self.delimiter("right", AtomClass::Close),
            "displaystyle" | "textstyle" | "limits" | "nolimits" | "big" | "Big" | "bigg"
            | "Bigg" | "bigl" | "bigr" | "Bigl" | "Bigr" => Ok(None),
            _ => Err(FormulaError::UnknownCommand(name)),
        }
    }
}

/// Maps the usual blackboard-bold letters; other content is left unchanged.
fn double_struck(node: Node) -> Node {
    let map = |c: char| match c {
        'R' => Some("\u{211d}"),
        'N' => Some("\u{2115}"),
        'Z' => Some("\u{2124}"),
        'Q' => Some("\u{211a}"),
        'C' => Some("\u{2102}"),
        _ => None,
    };
    match node {
        Node::Atom { text, class } => {
            let mut chars = text.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => match map(c) {
                    Some(glyph) => atom(glyph, class),
                    None => Node::Atom { text, class },
                },
                _ => Node::Atom { text, class },
            }
        }
        Node::Group(nodes) => Node::Group(nodes.into_iter().map(double_struck).collect()),
        other => other,
    }
}

fn attach_script(base: Node, kind: char, script: Node) -> Result<Node, FormulaError> {
    let script = Some(Box::new(script));
    match base {
        Node::Scripts { base, sup, sub } => match kind {
            '^' if sup.is_none() => Ok(Node::Scripts {
                base,
                sup: script,
                sub,
            }),
            '_' if sub.is_none() => Ok(Node::Scripts {
                base,
                sup,
                sub: script,
            }),
            _ => Err(FormulaError::DoubleScript(kind)),
        },
        other => {
            let (sup, sub) = if kind == '^' {
                (script, None)
            } else {
                (None, script)
            };
            Ok(Node::Scripts {
                base: Box::new(other),
                sup,
                sub,
            })
        }
    }
}

/// Parses a formula into a node sequence.
///
/// # Example
/// ```rust
/// use md2report::formula::{parse_formula, Node};
///
/// let nodes = parse_formula("x^2 + 1").unwrap();
/// assert_eq!(nodes.len(), 3);
/// assert!(matches!(nodes[0], Node::Scripts { .. }));
/// assert!(parse_formula("\\unknowncommand").is_err());
/// ```
pub fn parse_formula(source: &str) -> Result<Vec<Node>, FormulaError> {
    let mut parser = FormulaParser::new(source, 0);
    let nodes = parser.sequence(false)?;
    log::trace!("parsed formula '{}' into {} nodes", parser.source, nodes.len());
    Ok(nodes)
}
