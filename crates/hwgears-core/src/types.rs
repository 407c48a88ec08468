//! The hwgears parametric hardware type system.
//!
//! Provides the fixed variant set of hardware types from spec §3: unsigned
//! and signed integers, fixed-point, tuples, queues (streams with an
//! end-of-transmission marker), unions, arrays, and the wildcard `Any`.
//!
//! Every type carries an ordered list of *arguments* ([`TypeArg`]); an
//! argument is either a concrete sub-type, an integer literal, or an
//! unresolved template-string variable. Structural equality and hashing are
//! derived directly from `(variant, args)` so `copy(t) == t` and
//! `hash(copy(t)) == hash(t)` hold for every constructible type (§8).

use serde::{Deserialize, Serialize};

/// A single argument slot on a [`HwType`].
///
/// Either a concrete sub-type, an integer literal (used for bitwidths,
/// array lengths, queue levels, fixed-point integer bits), or an
/// as-yet-unresolved template-string expression (kept as source text until
/// [`crate::type_ops::subst`] resolves it).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeArg {
    Type(Box<HwType>),
    Int(i64),
    Template(String),
}

impl TypeArg {
    pub fn ty(t: HwType) -> Self {
        TypeArg::Type(Box::new(t))
    }

    pub fn specified(&self) -> bool {
        match self {
            TypeArg::Type(t) => t.specified(),
            TypeArg::Int(_) => true,
            TypeArg::Template(_) => false,
        }
    }

    pub fn as_type(&self) -> Option<&HwType> {
        match self {
            TypeArg::Type(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            TypeArg::Int(v) => Some(*v),
            _ => None,
        }
    }
}

/// A named field of a [`HwType::Tuple`] or [`HwType::Union`].
pub type Field = (String, TypeArg);

/// The fixed set of hardware type variants.
///
/// Fields of anonymous positional tuples are auto-named `f0, f1, ...` by
/// the constructor helpers below (`tuple_positional`), matching spec §4.1's
/// design decision.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HwType {
    /// Unsigned integer of parametric bitwidth.
    Uint(Box<TypeArg>),
    /// Signed integer (two's complement) of parametric bitwidth.
    Int(Box<TypeArg>),
    /// Unsigned fixed-point: `int` integer bits, `width` total bits.
    Ufixp { int: Box<TypeArg>, width: Box<TypeArg> },
    /// Signed fixed-point: `int` integer bits, `width` total bits.
    Fixp { int: Box<TypeArg>, width: Box<TypeArg> },
    /// Ordered, named tuple of fields.
    Tuple(Vec<Field>),
    /// A stream carrying `elem` data plus an `lvl`-deep end-of-transmission
    /// marker. `Queue[T]` defaults `lvl` to `1`.
    Queue { elem: Box<TypeArg>, lvl: Box<TypeArg> },
    /// Ordered, named tagged union of variants.
    Union(Vec<Field>),
    /// Fixed-size homogeneous array.
    Array { elem: Box<TypeArg>, len: Box<TypeArg> },
    /// The wildcard/unconstrained type. Never `specified`.
    Any,
}

impl HwType {
    pub fn uint(width: i64) -> Self {
        HwType::Uint(Box::new(TypeArg::Int(width)))
    }

    pub fn int(width: i64) -> Self {
        HwType::Int(Box::new(TypeArg::Int(width)))
    }

    pub fn queue1(elem: HwType) -> Self {
        HwType::Queue {
            elem: Box::new(TypeArg::ty(elem)),
            lvl: Box::new(TypeArg::Int(1)),
        }
    }

    pub fn queue(elem: HwType, lvl: i64) -> Self {
        HwType::Queue {
            elem: Box::new(TypeArg::ty(elem)),
            lvl: Box::new(TypeArg::Int(lvl)),
        }
    }

    pub fn array(elem: HwType, len: i64) -> Self {
        HwType::Array {
            elem: Box::new(TypeArg::ty(elem)),
            len: Box::new(TypeArg::Int(len)),
        }
    }

    /// Builds a `Tuple` from positional (unnamed) fields, auto-naming them
    /// `f0, f1, ...` per spec §4.1.
    pub fn tuple_positional(fields: Vec<HwType>) -> Self {
        let fields = fields
            .into_iter()
            .enumerate()
            .map(|(i, t)| (format!("f{i}"), TypeArg::ty(t)))
            .collect();
        HwType::Tuple(fields)
    }

    pub fn tuple_named(fields: Vec<(impl Into<String>, HwType)>) -> Self {
        HwType::Tuple(
            fields
                .into_iter()
                .map(|(n, t)| (n.into(), TypeArg::ty(t)))
                .collect(),
        )
    }

    /// `true` iff every argument is concrete, recursively.
    pub fn specified(&self) -> bool {
        match self {
            HwType::Any => false,
            HwType::Uint(a) | HwType::Int(a) => a.specified(),
            HwType::Ufixp { int, width } | HwType::Fixp { int, width } => {
                int.specified() && width.specified()
            }
            HwType::Queue { elem, lvl } => elem.specified() && lvl.specified(),
            HwType::Array { elem, len } => elem.specified() && len.specified(),
            HwType::Tuple(fields) | HwType::Union(fields) => {
                fields.iter().all(|(_, a)| a.specified())
            }
        }
    }

    /// Returns the field/variant names for enumerable kinds (`Tuple`,
    /// `Union`), or the synthesized positional names for `Queue`
    /// (`["data", "eot"]`) and `Array` (`["0", "1", ...]`).
    pub fn keys(&self) -> Vec<String> {
        match self {
            HwType::Tuple(fields) | HwType::Union(fields) => {
                fields.iter().map(|(n, _)| n.clone()).collect()
            }
            HwType::Queue { .. } => vec!["data".to_string(), "eot".to_string()],
            HwType::Array { len, .. } => {
                let n = len.as_int().unwrap_or(0).max(0) as usize;
                (0..n).map(|i| i.to_string()).collect()
            }
            _ => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.keys().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uint_is_specified() {
        assert!(HwType::uint(4).specified());
    }

    #[test]
    fn any_is_never_specified() {
        assert!(!HwType::Any.specified());
    }

    #[test]
    fn template_arg_is_unspecified() {
        let t = HwType::Uint(Box::new(TypeArg::Template("N".into())));
        assert!(!t.specified());
    }

    #[test]
    fn tuple_positional_auto_names() {
        let t = HwType::tuple_positional(vec![HwType::uint(1), HwType::uint(2)]);
        assert_eq!(t.keys(), vec!["f0", "f1"]);
    }

    #[test]
    fn queue_keys_are_data_and_eot() {
        let t = HwType::queue1(HwType::uint(4));
        assert_eq!(t.keys(), vec!["data", "eot"]);
    }

    #[test]
    fn copy_equals_self_and_hashes_equal() {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let t = HwType::tuple_named(vec![("a", HwType::uint(1)), ("b", HwType::uint(2))]);
        let c = t.clone();
        assert_eq!(t, c);

        let mut h1 = DefaultHasher::new();
        t.hash(&mut h1);
        let mut h2 = DefaultHasher::new();
        c.hash(&mut h2);
        assert_eq!(h1.finish(), h2.finish());
    }

    #[test]
    fn serde_roundtrip_queue() {
        let t = HwType::queue(HwType::int(8), 2);
        let json = serde_json::to_string(&t).unwrap();
        let back: HwType = serde_json::from_str(&json).unwrap();
        assert_eq!(t, back);
    }
}
