/// Abstract Syntax Tree for process time formulas
/// A closed tagged tree: literals, variables, operators and whitelisted calls.

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    /// Bare identifier, resolved against the operation environment
    Variable(String),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    /// `condition ? then : otherwise`
    Conditional {
        condition: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Call(Function, Vec<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

/// The math functions a formula may call. Nothing else is callable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Ceil,
    Floor,
    Round,
    Max,
    Min,
    Pow,
    Sqrt,
}

/// Accepted argument counts for a function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exactly(n) => count == n,
            Arity::AtLeast(n) => count >= n,
        }
    }
}

impl std::fmt::Display for Arity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Arity::Exactly(1) => write!(f, "1 argument"),
            Arity::Exactly(n) => write!(f, "{} arguments", n),
            Arity::AtLeast(n) => write!(f, "at least {} argument(s)", n),
        }
    }
}

impl Function {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ceil" => Some(Function::Ceil),
            "floor" => Some(Function::Floor),
            "round" => Some(Function::Round),
            "max" => Some(Function::Max),
            "min" => Some(Function::Min),
            "pow" => Some(Function::Pow),
            "sqrt" => Some(Function::Sqrt),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Function::Ceil => "ceil",
            Function::Floor => "floor",
            Function::Round => "round",
            Function::Max => "max",
            Function::Min => "min",
            Function::Pow => "pow",
            Function::Sqrt => "sqrt",
        }
    }

    pub fn arity(self) -> Arity {
        match self {
            Function::Max | Function::Min => Arity::AtLeast(1),
            Function::Pow => Arity::Exactly(2),
            Function::Ceil | Function::Floor | Function::Round | Function::Sqrt => {
                Arity::Exactly(1)
            }
        }
    }
}

/// Names that evaluate to π
pub const PI_NAMES: [&str; 2] = ["PI", "pi"];

/// Namespace prefix formulas may use in front of a function or `PI`
pub const MATH_NAMESPACE: &str = "Math";

impl Expr {
    /// Names of all variables the expression reads
    pub fn variables(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_variables(&mut names);
        names.sort_unstable();
        names.dedup();
        names
    }

    fn collect_variables<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Expr::Number(_) => {}
            Expr::Variable(name) => names.push(name),
            Expr::Unary(_, operand) => operand.collect_variables(names),
            Expr::Binary(_, lhs, rhs) => {
                lhs.collect_variables(names);
                rhs.collect_variables(names);
            }
            Expr::Conditional {
                condition,
                then,
                otherwise,
            } => {
                condition.collect_variables(names);
                then.collect_variables(names);
                otherwise.collect_variables(names);
            }
            Expr::Call(_, args) => {
                for arg in args {
                    arg.collect_variables(names);
                }
            }
        }
    }
}
