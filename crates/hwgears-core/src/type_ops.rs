//! Structural operations over [`HwType`]: substitution, unification,
//! indexing, renaming, and the arithmetic typing rules for binary/unary
//! operators.

use crate::error::CoreError;
use crate::id::Width;
use crate::template::{self, Env};
use crate::types::{Field, HwType, TypeArg};

/// Recursively resolves every `TypeArg::Template` in `t` by evaluating its
/// source text against `env`. Arguments that fail to resolve (unbound
/// name, or not yet computable because a sibling argument is itself
/// unresolved) are left as `Template` unchanged -- substitution is
/// best-effort and idempotent, never erroring (spec §4.1).
pub fn subst(t: &HwType, env: &Env) -> HwType {
    let arg = |a: &TypeArg| -> TypeArg {
        match a {
            TypeArg::Type(inner) => TypeArg::Type(Box::new(subst(inner, env))),
            TypeArg::Int(v) => TypeArg::Int(*v),
            TypeArg::Template(expr) => match template::eval(expr, env) {
                Some(template::Value::Int(v)) => TypeArg::Int(v),
                Some(template::Value::Type(ty)) => TypeArg::Type(Box::new(ty)),
                None => TypeArg::Template(expr.clone()),
            },
        }
    };
    let fields = |fs: &[Field]| -> Vec<Field> {
        fs.iter().map(|(n, a)| (n.clone(), arg(a))).collect()
    };
    match t {
        HwType::Any => HwType::Any,
        HwType::Uint(a) => HwType::Uint(Box::new(arg(a))),
        HwType::Int(a) => HwType::Int(Box::new(arg(a))),
        HwType::Ufixp { int, width } => HwType::Ufixp {
            int: Box::new(arg(int)),
            width: Box::new(arg(width)),
        },
        HwType::Fixp { int, width } => HwType::Fixp {
            int: Box::new(arg(int)),
            width: Box::new(arg(width)),
        },
        HwType::Queue { elem, lvl } => HwType::Queue {
            elem: Box::new(arg(elem)),
            lvl: Box::new(arg(lvl)),
        },
        HwType::Array { elem, len } => HwType::Array {
            elem: Box::new(arg(elem)),
            len: Box::new(arg(len)),
        },
        HwType::Tuple(fs) => HwType::Tuple(fields(fs)),
        HwType::Union(fs) => HwType::Union(fields(fs)),
    }
}

/// Attempts to unify a concrete `actual` type against a (possibly
/// templated) `pattern`, returning the bindings a successful match would
/// add to the template environment. Fails if the two types have different
/// shapes, or if a name is bound to two different values.
pub fn unify(pattern: &HwType, actual: &HwType, env: &mut Env) -> Result<(), CoreError> {
    fn unify_arg(pat: &TypeArg, act: &TypeArg, env: &mut Env) -> Result<(), CoreError> {
        match (pat, act) {
            (TypeArg::Template(name), _) => {
                let value = match act {
                    TypeArg::Int(v) => template::Value::Int(*v),
                    TypeArg::Type(t) => template::Value::Type((**t).clone()),
                    TypeArg::Template(_) => return Ok(()),
                };
                if let Some(existing) = env.get(name) {
                    if *existing != value {
                        return Err(CoreError::TypeMatch {
                            reason: format!("conflicting bindings for '{name}'"),
                        });
                    }
                } else {
                    env.insert(name.clone(), value);
                }
                Ok(())
            }
            (TypeArg::Int(p), TypeArg::Int(a)) => {
                if p == a {
                    Ok(())
                } else {
                    Err(CoreError::TypeMatch {
                        reason: format!("expected int {p}, got {a}"),
                    })
                }
            }
            (TypeArg::Type(p), TypeArg::Type(a)) => unify(p, a, env),
            _ => Err(CoreError::TypeMatch {
                reason: "argument kind mismatch".into(),
            }),
        }
    }

    match (pattern, actual) {
        (HwType::Any, _) | (_, HwType::Any) => Ok(()),
        (HwType::Uint(p), HwType::Uint(a)) | (HwType::Int(p), HwType::Int(a)) => {
            unify_arg(p, a, env)
        }
        (
            HwType::Ufixp { int: pi, width: pw },
            HwType::Ufixp { int: ai, width: aw },
        )
        | (HwType::Fixp { int: pi, width: pw }, HwType::Fixp { int: ai, width: aw }) => {
            unify_arg(pi, ai, env)?;
            unify_arg(pw, aw, env)
        }
        (HwType::Queue { elem: pe, lvl: pl }, HwType::Queue { elem: ae, lvl: al }) => {
            unify_arg(pe, ae, env)?;
            unify_arg(pl, al, env)
        }
        (HwType::Array { elem: pe, len: pln }, HwType::Array { elem: ae, len: aln }) => {
            unify_arg(pe, ae, env)?;
            unify_arg(pln, aln, env)
        }
        (HwType::Tuple(pf), HwType::Tuple(af)) | (HwType::Union(pf), HwType::Union(af)) => {
            if pf.len() != af.len() {
                return Err(CoreError::TypeMatch {
                    reason: format!("field count mismatch: {} vs {}", pf.len(), af.len()),
                });
            }
            for ((pn, pa), (an, aa)) in pf.iter().zip(af.iter()) {
                if pn != an {
                    return Err(CoreError::TypeMatch {
                        reason: format!("field name mismatch: '{pn}' vs '{an}'"),
                    });
                }
                unify_arg(pa, aa, env)?;
            }
            Ok(())
        }
        _ => Err(CoreError::TypeMatch {
            reason: "type shape mismatch".into(),
        }),
    }
}

/// The bit width of a fully-specified type. Errors if any argument is
/// still a template.
pub fn bitwidth(t: &HwType) -> Result<Width, CoreError> {
    if !t.specified() {
        return Err(CoreError::TemplatedTypeUnspecified {
            type_repr: format!("{t:?}"),
        });
    }
    let w = match t {
        HwType::Any => unreachable!("Any is never specified"),
        HwType::Uint(a) | HwType::Int(a) => Width(a.as_int().unwrap_or(0).max(0) as u32),
        HwType::Ufixp { width, .. } | HwType::Fixp { width, .. } => {
            Width(width.as_int().unwrap_or(0).max(0) as u32)
        }
        HwType::Queue { elem, lvl } => {
            let lvl = Width(lvl.as_int().unwrap_or(0).max(0) as u32);
            bitwidth(elem.as_type().expect("specified"))? + lvl
        }
        HwType::Array { elem, len } => {
            let n = len.as_int().unwrap_or(0).max(0) as u32;
            bitwidth(elem.as_type().expect("specified"))? * n
        }
        HwType::Tuple(fields) => {
            let mut total = Width(0);
            for (_, a) in fields {
                total = total + bitwidth(a.as_type().expect("specified"))?;
            }
            total
        }
        HwType::Union(fields) => {
            let mut max_bits = Width(0);
            for (_, a) in fields {
                max_bits = max_bits.max(bitwidth(a.as_type().expect("specified"))?);
            }
            max_bits + Width(template::bitw((fields.len().max(1) - 1) as i64) as u32)
        }
    };
    Ok(w)
}

fn normalize_index(idx: i64, len: usize) -> Result<usize, CoreError> {
    let len_i = len as i64;
    let norm = if idx < 0 { idx + len_i } else { idx };
    if norm < 0 || norm >= len_i {
        Err(CoreError::IndexOutOfRange { index: idx, len })
    } else {
        Ok(norm as usize)
    }
}

/// `t[idx]`, with Python-style negative-index normalization. `Queue`
/// indexes like its two `keys()` (`["data", "eot"]`): index 0 is the
/// element type, index 1 is the `lvl`-wide unsigned eot marker (spec §8
/// scenario 2: `Queue[Uint[4], 2][1] == Uint[2]`).
pub fn index(t: &HwType, idx: i64) -> Result<HwType, CoreError> {
    match t {
        HwType::Tuple(fields) | HwType::Union(fields) => {
            let i = normalize_index(idx, fields.len())?;
            fields[i]
                .1
                .as_type()
                .cloned()
                .ok_or_else(|| CoreError::TypeMatch {
                    reason: "indexed field is not a type argument".into(),
                })
        }
        HwType::Array { elem, len } => {
            let n = len.as_int().unwrap_or(0).max(0) as usize;
            normalize_index(idx, n)?;
            elem.as_type().cloned().ok_or_else(|| CoreError::TypeMatch {
                reason: "array element is not a type argument".into(),
            })
        }
        HwType::Queue { elem, lvl } => {
            let i = normalize_index(idx, 2)?;
            if i == 0 {
                elem.as_type().cloned().ok_or_else(|| CoreError::TypeMatch {
                    reason: "queue element is not a type argument".into(),
                })
            } else {
                let lvl = lvl.as_int().ok_or_else(|| CoreError::TemplatedTypeUnspecified {
                    type_repr: "queue lvl".into(),
                })?;
                Ok(HwType::uint(lvl))
            }
        }
        _ => Err(CoreError::IndexOutOfRange { index: idx, len: 0 }),
    }
}

/// Looks a field up by name (`Tuple`/`Union` only).
pub fn by_name(t: &HwType, name: &str) -> Result<HwType, CoreError> {
    match t {
        HwType::Tuple(fields) | HwType::Union(fields) => fields
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, a)| a.as_type().cloned())
            .ok_or_else(|| CoreError::TypeMatch {
                reason: format!("no field named '{name}'"),
            }),
        _ => Err(CoreError::TypeMatch {
            reason: format!("type has no named fields, cannot index by '{name}'"),
        }),
    }
}

/// Renames a single field of a `Tuple`/`Union` in place, returning the
/// updated type. Errors if `old` does not exist or `new` already does.
pub fn rename(t: &HwType, old: &str, new: &str) -> Result<HwType, CoreError> {
    let build = |fields: &[Field], ctor: fn(Vec<Field>) -> HwType| -> Result<HwType, CoreError> {
        if fields.iter().any(|(n, _)| n == new) {
            return Err(CoreError::DuplicateName { name: new.to_string() });
        }
        if !fields.iter().any(|(n, _)| n == old) {
            return Err(CoreError::TypeMatch {
                reason: format!("no field named '{old}'"),
            });
        }
        Ok(ctor(
            fields
                .iter()
                .map(|(n, a)| {
                    if n == old {
                        (new.to_string(), a.clone())
                    } else {
                        (n.clone(), a.clone())
                    }
                })
                .collect(),
        ))
    };
    match t {
        HwType::Tuple(fields) => build(fields, HwType::Tuple),
        HwType::Union(fields) => build(fields, HwType::Union),
        _ => Err(CoreError::TypeMatch {
            reason: "only Tuple/Union fields can be renamed".into(),
        }),
    }
}

/// Replaces the type of a single named field, keeping its position.
pub fn replace(t: &HwType, name: &str, new_type: HwType) -> Result<HwType, CoreError> {
    let build = |fields: &[Field], ctor: fn(Vec<Field>) -> HwType| -> Result<HwType, CoreError> {
        if !fields.iter().any(|(n, _)| n == name) {
            return Err(CoreError::TypeMatch {
                reason: format!("no field named '{name}'"),
            });
        }
        Ok(ctor(
            fields
                .iter()
                .map(|(n, a)| {
                    if n == name {
                        (n.clone(), TypeArg::ty(new_type.clone()))
                    } else {
                        (n.clone(), a.clone())
                    }
                })
                .collect(),
        ))
    };
    match t {
        HwType::Tuple(fields) => build(fields, HwType::Tuple),
        HwType::Union(fields) => build(fields, HwType::Union),
        _ => Err(CoreError::TypeMatch {
            reason: "only Tuple/Union fields can be replaced".into(),
        }),
    }
}

/// Drops a named field entirely, shifting later positional names down for
/// unnamed (auto-named `f{i}`) tuples -- matches the source semantics
/// where removing from a plain tuple renumbers it.
pub fn remove(t: &HwType, name: &str) -> Result<HwType, CoreError> {
    let build = |fields: &[Field], ctor: fn(Vec<Field>) -> HwType| -> Result<HwType, CoreError> {
        if !fields.iter().any(|(n, _)| n == name) {
            return Err(CoreError::TypeMatch {
                reason: format!("no field named '{name}'"),
            });
        }
        Ok(ctor(
            fields
                .iter()
                .filter(|(n, _)| n != name)
                .cloned()
                .collect(),
        ))
    };
    match t {
        HwType::Tuple(fields) => build(fields, HwType::Tuple),
        HwType::Union(fields) => build(fields, HwType::Union),
        _ => Err(CoreError::TypeMatch {
            reason: "only Tuple/Union fields can be removed".into(),
        }),
    }
}

/// Structural deep copy. `HwType`/`TypeArg` already derive `Clone`, but
/// this makes the spec §8 invariant (`copy(T) == T`) explicit at call
/// sites that care about it.
pub fn copy(t: &HwType) -> HwType {
    t.clone()
}

/// Binary arithmetic operators supported by the expression IR (spec §3's
/// `BinOpExpr`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    And,
    Or,
    Xor,
    Shl,
    Shr,
}

/// Computes the result type of `lhs <op> rhs` for `Uint`/`Int` operands,
/// following the original's width-growth rules: `+`/`-` grow by one bit to
/// hold carry/borrow, `*` sums both widths, bitwise ops take the max
/// width, shifts keep the left operand's width, and mixing a `Uint` with
/// an `Int` always yields `Int` (signedness is "sticky"). When signedness
/// is mixed, the unsigned operand's width is first widened by one bit so
/// its value still fits once reinterpreted as signed -- this is the
/// "explicit widening of the unsigned operand" spec §4.1 calls for (e.g.
/// `Int[2] + Uint[3]` widens the `Uint[3]` to 4 bits before adding, giving
/// `Int[5]`, not `Int[4]`).
pub fn arith_result_type(op: ArithOp, lhs: &HwType, rhs: &HwType) -> Result<HwType, CoreError> {
    let (lw, l_signed) = arith_operand(lhs)?;
    let (rw, r_signed) = arith_operand(rhs)?;
    let signed = l_signed || r_signed;
    let lw = if signed && !l_signed { lw + Width(1) } else { lw };
    let rw = if signed && !r_signed { rw + Width(1) } else { rw };
    let width = match op {
        ArithOp::Add | ArithOp::Sub => lw.max(rw) + Width(1),
        ArithOp::Mul => lw + rw,
        ArithOp::And | ArithOp::Or | ArithOp::Xor => lw.max(rw),
        ArithOp::Shl | ArithOp::Shr => lw,
    };
    Ok(if signed {
        HwType::int(width.get() as i64)
    } else {
        HwType::uint(width.get() as i64)
    })
}

fn arith_operand(t: &HwType) -> Result<(Width, bool), CoreError> {
    match t {
        HwType::Uint(a) => Ok((bitwidth_of_arg(a)?, false)),
        HwType::Int(a) => Ok((bitwidth_of_arg(a)?, true)),
        _ => Err(CoreError::TypeMatch {
            reason: "arithmetic requires Uint/Int operands".into(),
        }),
    }
}

fn bitwidth_of_arg(a: &TypeArg) -> Result<Width, CoreError> {
    a.as_int()
        .map(|v| Width(v.max(0) as u32))
        .ok_or_else(|| CoreError::TemplatedTypeUnspecified {
            type_repr: format!("{a:?}"),
        })
}

/// Typing rule for integer literals: `0` is `Uint[1]`, a positive value
/// needs `bitw(v)` bits unsigned, a negative value needs `bitw(-v-1)+1`
/// bits signed (room for the sign bit). `-1` is the one value this
/// formula can't reach on its own: `bitw` floors at `1` (by design, so
/// template expressions like `bitw(len(x)-1)` never collapse to `0`),
/// so `bitw(-(-1)-1)+1` comes out to `bitw(0)+1 == 2` instead of the
/// single sign bit `-1` actually needs. Special-cased here instead of
/// changing `bitw`'s floor.
pub fn literal_type(v: i64) -> HwType {
    if v == 0 {
        HwType::uint(1)
    } else if v > 0 {
        HwType::uint(template::bitw(v))
    } else if v == -1 {
        HwType::int(1)
    } else {
        HwType::int(template::bitw(-v - 1) + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subst_resolves_template_from_env() {
        let t = HwType::Uint(Box::new(TypeArg::Template("bitw(len(din)-1)".into())));
        let mut env = Env::new();
        env.insert(
            "din".into(),
            template::Value::Type(HwType::tuple_positional(vec![
                HwType::uint(1),
                HwType::uint(1),
                HwType::uint(1),
            ])),
        );
        let resolved = subst(&t, &env);
        assert_eq!(resolved, HwType::uint(template::bitw(2)));
    }

    #[test]
    fn subst_leaves_unresolvable_template_untouched() {
        let t = HwType::Uint(Box::new(TypeArg::Template("missing".into())));
        let env = Env::new();
        assert_eq!(subst(&t, &env), t);
    }

    #[test]
    fn unify_binds_template_name() {
        let pattern = HwType::Uint(Box::new(TypeArg::Template("n".into())));
        let actual = HwType::uint(8);
        let mut env = Env::new();
        unify(&pattern, &actual, &mut env).unwrap();
        assert_eq!(env.get("n"), Some(&template::Value::Int(8)));
    }

    #[test]
    fn unify_rejects_conflicting_bindings() {
        let pattern = HwType::Tuple(vec![
            ("a".into(), TypeArg::Type(Box::new(HwType::Uint(Box::new(TypeArg::Template("n".into())))))),
            ("b".into(), TypeArg::Type(Box::new(HwType::Uint(Box::new(TypeArg::Template("n".into())))))),
        ]);
        let actual = HwType::tuple_named(vec![("a", HwType::uint(4)), ("b", HwType::uint(8))]);
        let mut env = Env::new();
        assert!(unify(&pattern, &actual, &mut env).is_err());
    }

    #[test]
    fn bitwidth_of_tuple_sums_fields() {
        let t = HwType::tuple_named(vec![("a", HwType::uint(4)), ("b", HwType::uint(8))]);
        assert_eq!(bitwidth(&t).unwrap(), Width(12));
    }

    #[test]
    fn bitwidth_of_queue_includes_eot_levels() {
        let t = HwType::queue(HwType::uint(4), 2);
        assert_eq!(bitwidth(&t).unwrap(), Width(6));
    }

    #[test]
    fn queue_indexes_into_data_and_eot() {
        let t = HwType::queue(HwType::uint(4), 2);
        assert_eq!(index(&t, 0).unwrap(), HwType::uint(4));
        assert_eq!(index(&t, 1).unwrap(), HwType::uint(2));
    }

    #[test]
    fn bitwidth_of_templated_type_errors() {
        let t = HwType::Uint(Box::new(TypeArg::Template("n".into())));
        assert!(bitwidth(&t).is_err());
    }

    #[test]
    fn index_normalizes_negative() {
        let t = HwType::tuple_positional(vec![HwType::uint(1), HwType::uint(2), HwType::uint(3)]);
        assert_eq!(index(&t, -1).unwrap(), HwType::uint(3));
        assert_eq!(index(&t, 0).unwrap(), HwType::uint(1));
        assert!(index(&t, 3).is_err());
    }

    #[test]
    fn rename_and_replace_and_remove() {
        let t = HwType::tuple_named(vec![("a", HwType::uint(1)), ("b", HwType::uint(2))]);
        let renamed = rename(&t, "a", "x").unwrap();
        assert_eq!(renamed.keys(), vec!["x", "b"]);

        let replaced = replace(&t, "a", HwType::uint(9)).unwrap();
        assert_eq!(by_name(&replaced, "a").unwrap(), HwType::uint(9));

        let removed = remove(&t, "a").unwrap();
        assert_eq!(removed.keys(), vec!["b"]);
    }

    #[test]
    fn arith_add_grows_width_by_one() {
        let result = arith_result_type(ArithOp::Add, &HwType::uint(4), &HwType::uint(4)).unwrap();
        assert_eq!(result, HwType::uint(5));
    }

    #[test]
    fn arith_mixed_signedness_yields_signed() {
        let result = arith_result_type(ArithOp::Add, &HwType::uint(4), &HwType::int(4)).unwrap();
        assert_eq!(result, HwType::int(6));
    }

    #[test]
    fn arith_spec_scenario_uint2_plus_uint3_is_uint4() {
        let result = arith_result_type(ArithOp::Add, &HwType::uint(2), &HwType::uint(3)).unwrap();
        assert_eq!(result, HwType::uint(4));
    }

    #[test]
    fn arith_spec_scenario_int2_plus_uint3_is_int5() {
        let result = arith_result_type(ArithOp::Add, &HwType::int(2), &HwType::uint(3)).unwrap();
        assert_eq!(result, HwType::int(5));
    }

    #[test]
    fn literal_type_rules() {
        assert_eq!(literal_type(0), HwType::uint(1));
        assert_eq!(literal_type(3), HwType::uint(2));
        assert_eq!(literal_type(-1), HwType::int(1));
        assert_eq!(literal_type(-2), HwType::int(2));
        assert_eq!(literal_type(-4), HwType::int(3));
    }
}
