//! The global namespace of shared declarations.
//!
//! A tree of insertion-ordered maps: inner nodes are namespaces keyed by
//! name segment, leaves hold what a name denotes. The namespace is built
//! once by ingesting the shared pseudocode fragment's declarations and
//! is read-only afterwards; it owns every declaration registered in it.
//!
//! Function leaves bundle overloads (the same name may be declared
//! several times with different signatures); accessor leaves hold the
//! setter and getter halves of an array-like accessor. Everything else
//! is a plain leaf. Defining an already-occupied slot is a hard error,
//! with one exception kept from the original contract: re-ingesting a
//! setter or getter overwrites the accessor slot.

use indexmap::map::Entry;
use indexmap::IndexMap;
use thiserror::Error;

use aslc_lex::Token;
use aslc_par::ast::{Decl, FunctionKind, NameChain};

/// Names accepted as resolved without any declaration: architectural
/// state the shared fragment never declares.
pub const IMPLICIT_NAMES: &[&str] = &[
    "CONTEXTIDR_EL2",
    "DLR",
    "DLR_EL0",
    "DSPSR",
    "DSPSR_EL0",
    "EDESR",
    "FPCR",
    "FPSCR",
    "FPSR",
    "MPAMVPM0_EL2",
    "MPAMVPM1_EL2",
    "MPAMVPM2_EL2",
    "MPAMVPM3_EL2",
    "MPAMVPM4_EL2",
    "MPAMVPM5_EL2",
    "MPAMVPM6_EL2",
    "MPAMVPM7_EL2",
    "PMSEVFR_EL1",
    "IsNonTagCheckedInstruction",
    "Real",
    "ReservedEncoding",
    "Sqrt",
    "UndefinedFault",
];

/// A namespace tree node.
#[derive(Debug)]
pub enum Node {
    /// An inner node mapping name segments to children
    Namespace(IndexMap<String, Node>),
    /// A function with its overload signatures
    Function(Vec<(String, Decl)>),
    /// An accessor with optional setter and getter halves
    Accessor {
        setter: Option<Decl>,
        getter: Option<Decl>,
    },
    /// A global variable; `constant` distinguishes `constant` declarations
    Variable { constant: bool },
    /// A global array
    Array,
    /// An enumeration or one of its values
    Enumeration,
    /// A structure type (`type ... is (...)` or an opaque `type ...;`)
    Struct,
    /// A type alias (`type ... = ...;`)
    Type,
}

/// Errors raised while building the namespace.
#[derive(Debug, Error)]
pub enum NsError {
    #[error("redefinition of `{name}`")]
    Redefined { name: String },
    #[error("`{name}` is already defined and is not a namespace")]
    NotANamespace { name: String },
    #[error("`{name}` is already defined with a different kind")]
    WrongKind { name: String },
    #[error("cannot define an empty name")]
    EmptyName,
}

/// A name that did not resolve.
#[derive(Debug, Error)]
#[error("cannot resolve `{name}`")]
pub struct LookupError {
    pub name: String,
}

fn segment(token: &Token) -> String {
    match token.ident_name() {
        Some(name) => name.to_string(),
        None => token.to_string(),
    }
}

fn chain_string(name: &[Token]) -> String {
    NameChain(name).to_string()
}

/// The hierarchical symbol registry.
#[derive(Debug, Default)]
pub struct Namespace {
    root: IndexMap<String, Node>,
}

impl Namespace {
    /// An empty namespace.
    pub fn new() -> Self {
        Self::default()
    }

    /// The top-level members, in declaration order.
    pub fn members(&self) -> &IndexMap<String, Node> {
        &self.root
    }

    /// Walk to the map holding the children of `prefix`, creating inner
    /// namespace nodes as needed.
    fn walk_create(&mut self, prefix: &[Token]) -> Result<&mut IndexMap<String, Node>, NsError> {
        let mut map = &mut self.root;
        for part in prefix {
            let node = map
                .entry(segment(part))
                .or_insert_with(|| Node::Namespace(IndexMap::new()));
            map = match node {
                Node::Namespace(children) => children,
                _ => {
                    return Err(NsError::NotANamespace {
                        name: segment(part),
                    })
                }
            };
        }
        Ok(map)
    }

    /// Define `name` as `node`; the terminal slot must be empty.
    pub fn define(&mut self, name: &[Token], node: Node) -> Result<(), NsError> {
        let (last, prefix) = name.split_last().ok_or(NsError::EmptyName)?;
        let map = self.walk_create(prefix)?;
        match map.entry(segment(last)) {
            Entry::Occupied(_) => Err(NsError::Redefined {
                name: chain_string(name),
            }),
            Entry::Vacant(slot) => {
                slot.insert(node);
                Ok(())
            }
        }
    }

    /// Find `name`'s leaf, creating it with `default` if absent.
    fn find_or_create(
        &mut self,
        name: &[Token],
        default: impl FnOnce() -> Node,
    ) -> Result<&mut Node, NsError> {
        let (last, prefix) = name.split_last().ok_or(NsError::EmptyName)?;
        let map = self.walk_create(prefix)?;
        Ok(map.entry(segment(last)).or_insert_with(default))
    }

    /// Resolve a name chain. `Ok(Some(_))` is a defined leaf;
    /// `Ok(None)` is the null leaf of an implicit name.
    pub fn lookup(&self, name: &[&str]) -> Result<Option<&Node>, LookupError> {
        let not_found = || LookupError {
            name: name.join("."),
        };

        let mut map = &self.root;
        for (i, part) in name.iter().enumerate() {
            let last = i == name.len() - 1;
            match map.get(*part) {
                Some(Node::Namespace(children)) => {
                    if last {
                        // a namespace is not a value
                        return Err(not_found());
                    }
                    map = children;
                }
                Some(node) => {
                    if last {
                        return Ok(Some(node));
                    }
                    // a leaf in the middle of the chain
                    return Err(not_found());
                }
                None => break,
            }
        }

        if name.len() == 1 && IMPLICIT_NAMES.contains(&name[0]) {
            return Ok(None);
        }
        Err(not_found())
    }

    /// Ingest one shared declaration, taking ownership of it.
    pub fn ingest(&mut self, declaration: Decl) -> Result<(), NsError> {
        match declaration {
            Decl::Function {
                kind: FunctionKind::Function,
                ref name,
                ..
            } => {
                let name = name.clone();
                let signature = declaration.signature().unwrap_or_default();
                let node = self.find_or_create(&name, || Node::Function(Vec::new()))?;
                match node {
                    Node::Function(overloads) => {
                        overloads.push((signature, declaration));
                        Ok(())
                    }
                    _ => Err(NsError::WrongKind {
                        name: chain_string(&name),
                    }),
                }
            }
            Decl::Function {
                kind, ref name, ..
            } => {
                let name = name.clone();
                let node = self.find_or_create(&name, || Node::Accessor {
                    setter: None,
                    getter: None,
                })?;
                match node {
                    Node::Accessor { setter, getter } => {
                        if kind == FunctionKind::Setter {
                            *setter = Some(declaration);
                        } else {
                            *getter = Some(declaration);
                        }
                        Ok(())
                    }
                    _ => Err(NsError::WrongKind {
                        name: chain_string(&name),
                    }),
                }
            }
            Decl::Variable { constant, vars, .. } => {
                for (name, _init) in &vars {
                    self.define(name, Node::Variable { constant })?;
                }
                Ok(())
            }
            Decl::Array { ref name, .. } => {
                let name = name.clone();
                self.define(&name, Node::Array)
            }
            Decl::Enumeration {
                ref name,
                ref values,
            } => {
                let name = name.clone();
                let values = values.clone();
                self.define(std::slice::from_ref(&name), Node::Enumeration)?;
                // enumeration values are also top-level names
                for value in &values {
                    self.define(std::slice::from_ref(value), Node::Enumeration)?;
                }
                Ok(())
            }
            Decl::Type { ref name, .. } => {
                let name = name.clone();
                self.define(&name, Node::Struct)
            }
            Decl::TypeEquals { ref name, .. } => {
                let name = name.clone();
                self.define(&name, Node::Type)
            }
        }
    }
}
