//! Gear instantiation: building one hierarchy node from a gear definition
//! plus a list of call-site arguments.
//!
//! Mirrors the original's `gear()` decorator call path: check arity,
//! wrap bare literal arguments as constant-producing leaf nodes
//! (`wrap_literal_arg`), create and connect ports, run template inference
//! to a fixed point, check the `enablement` predicate, and derive the
//! gear's output type(s).

use hwgears_core::error::CoreError;
use hwgears_core::id::{HierId, InterfaceId, PortId};
use hwgears_core::template::Env;
use hwgears_core::type_ops;
use hwgears_core::types::HwType;

use crate::context::ElaborationContext;
use crate::error::ElabError;
use crate::infer::{max_infer_passes, run_to_fixed_point};

/// One formal parameter of a gear definition.
#[derive(Debug, Clone)]
pub struct GearParam {
    pub name: String,
    /// The parameter's declared (possibly templated) type.
    pub dtype: HwType,
    /// Whether this parameter accepts literal (non-interface) arguments,
    /// which get wrapped into a constant leaf node via
    /// [`wrap_literal_arg`] rather than connected directly.
    pub accepts_literal: bool,
}

/// A value supplied at a gear call site: either an already-elaborated
/// interface's type, or a bare literal to be wrapped as a constant.
#[derive(Debug, Clone)]
pub enum GearArg {
    Interface(HwType),
    Literal(i64),
}

/// A fully-specified gear definition: name, formal parameters, and an
/// `enablement` predicate evaluated once all parameter types are known.
pub struct GearDef {
    pub name: String,
    pub params: Vec<GearParam>,
    pub enablement: Box<dyn Fn(&[HwType]) -> bool>,
    pub output: Box<dyn Fn(&[HwType]) -> HwType>,
}

/// The result of successfully instantiating a gear: the hierarchy node
/// created for it, its resolved input types in parameter order, and its
/// derived output type.
pub struct GearInstance {
    pub node: HierId,
    pub in_ports: Vec<PortId>,
    pub input_types: Vec<HwType>,
    pub output_type: HwType,
    pub out_port: PortId,
    pub output_interface: InterfaceId,
}

/// Wraps a bare literal argument as the output type of a synthesized
/// constant leaf node, per the literal-typing rules in
/// `hwgears_core::type_ops::literal_type` (`0 -> Uint[1]`, positive
/// `-> Uint[bitw(v)]`, negative `-> Int[bitw(v)]`).
pub fn wrap_literal_arg(value: i64) -> HwType {
    type_ops::literal_type(value)
}

/// Instantiates `def` under `ctx`'s current hierarchy scope with the
/// given call-site `args`.
///
/// Arity is checked first (too few params with no alternative is an
/// error upstream, in `hwgears_core::partial`; here, too many arguments
/// for this specific alternative is rejected outright). Literal
/// arguments are wrapped via [`wrap_literal_arg`]. Template parameters
/// are then driven to a fixed point (`hwgears_elab::infer`), the
/// `enablement` predicate is checked against the resolved input types,
/// and on success the node is committed into the hierarchy; on any
/// failure the (uncommitted) node is rolled back automatically by
/// `HierScope`'s `Drop`.
pub fn instantiate(
    ctx: &mut ElaborationContext,
    def: &GearDef,
    args: &[GearArg],
) -> Result<GearInstance, ElabError> {
    if args.len() > def.params.len() {
        return Err(ElabError::TooManyArguments {
            gear: def.name.clone(),
            got: args.len(),
            max: def.params.len(),
        });
    }

    let mut scope = ctx.enter(def.name.clone());
    let node = scope.id();

    let mut env = Env::new();
    let mut input_types = Vec::with_capacity(def.params.len());
    let mut missing = Vec::new();

    for (i, param) in def.params.iter().enumerate() {
        let actual = match args.get(i) {
            Some(GearArg::Interface(t)) => t.clone(),
            Some(GearArg::Literal(v)) => wrap_literal_arg(*v),
            None => {
                missing.push(param.name.clone());
                input_types.push(HwType::Any);
                continue;
            }
        };
        // Bind any template names the declared parameter type carries
        // (e.g. `Uint[Template("n")]`) against the caller's concrete
        // type before falling back to the concrete type itself.
        if type_ops::unify(&param.dtype, &actual, &mut env).is_err() {
            return Err(CoreError::TypeMatch {
                reason: format!(
                    "gear '{}' argument '{}' does not match declared type",
                    def.name, param.name
                ),
            }
            .into());
        }
        crate::infer::bind_type(&mut env, &param.name, actual.clone());
        input_types.push(actual);
    }

    if !missing.is_empty() {
        return Err(ElabError::GearArgsNotSpecified {
            gear: def.name.clone(),
            missing: missing.join(", "),
        });
    }

    let max_passes = max_infer_passes(def.params.len());
    let (resolved_types, all_specified, converged) = run_to_fixed_point(&input_types, &mut env, max_passes);
    if !all_specified {
        if !converged {
            return Err(ElabError::InferenceDidNotConverge {
                gear: def.name.clone(),
                passes: max_passes,
            });
        }
        return Err(ElabError::GearTypeNotSpecified {
            gear: def.name.clone(),
            type_repr: format!("{resolved_types:?}"),
        });
    }

    if !(def.enablement)(&resolved_types) {
        return Err(CoreError::TypeMatch {
            reason: format!("enablement rejected gear '{}'", def.name),
        }
        .into());
    }

    let output_type = (def.output)(&resolved_types);

    let mut in_ports = Vec::with_capacity(def.params.len());
    for (param, dtype) in def.params.iter().zip(resolved_types.iter()) {
        let port_id = scope.hierarchy_mut().alloc_in_port(node, param.name.clone(), dtype.clone());
        in_ports.push(port_id);
    }
    let (out_port, output_interface) =
        scope.hierarchy_mut().alloc_out_port(node, "dout", output_type.clone());

    scope.commit();

    Ok(GearInstance {
        node,
        in_ports,
        input_types: resolved_types,
        output_type,
        out_port,
        output_interface,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pass_through_def() -> GearDef {
        GearDef {
            name: "ibuf".to_string(),
            params: vec![GearParam {
                name: "din".to_string(),
                dtype: HwType::Any,
                accepts_literal: false,
            }],
            enablement: Box::new(|_| true),
            output: Box::new(|types| types[0].clone()),
        }
    }

    #[test]
    fn instantiate_succeeds_with_matching_arity() {
        let mut ctx = ElaborationContext::new();
        let def = pass_through_def();
        let instance = instantiate(&mut ctx, &def, &[GearArg::Interface(HwType::uint(8))]).unwrap();
        assert_eq!(instance.output_type, HwType::uint(8));
        assert_eq!(ctx.hierarchy.get(instance.node).unwrap().name, "ibuf");
    }

    #[test]
    fn instantiate_rejects_too_many_arguments() {
        let mut ctx = ElaborationContext::new();
        let def = pass_through_def();
        let result = instantiate(
            &mut ctx,
            &def,
            &[GearArg::Interface(HwType::uint(8)), GearArg::Interface(HwType::uint(4))],
        );
        assert!(matches!(result, Err(ElabError::TooManyArguments { .. })));
    }

    #[test]
    fn instantiate_rejects_missing_arguments() {
        let mut ctx = ElaborationContext::new();
        let def = pass_through_def();
        let result = instantiate(&mut ctx, &def, &[]);
        assert!(matches!(result, Err(ElabError::GearArgsNotSpecified { .. })));
    }

    #[test]
    fn failed_instantiation_rolls_back_hierarchy_node() {
        let mut ctx = ElaborationContext::new();
        let def = GearDef {
            name: "rejector".to_string(),
            params: vec![GearParam {
                name: "din".to_string(),
                dtype: HwType::Any,
                accepts_literal: false,
            }],
            enablement: Box::new(|_| false),
            output: Box::new(|types| types[0].clone()),
        };
        let result = instantiate(&mut ctx, &def, &[GearArg::Interface(HwType::uint(8))]);
        assert!(result.is_err());
        assert_eq!(ctx.hierarchy.current(), None);
    }

    #[test]
    fn instantiate_allocates_real_ports_and_an_output_interface() {
        let mut ctx = ElaborationContext::new();
        let def = pass_through_def();
        let instance = instantiate(&mut ctx, &def, &[GearArg::Interface(HwType::uint(8))]).unwrap();

        let node = ctx.hierarchy.get(instance.node).unwrap();
        assert_eq!(node.in_ports, instance.in_ports);
        assert_eq!(node.out_ports, vec![instance.out_port]);

        let in_port = ctx.hierarchy.in_port(instance.in_ports[0]).unwrap();
        assert_eq!(in_port.name, "din");
        assert_eq!(in_port.dtype, HwType::uint(8));

        let out_port = ctx.hierarchy.out_port(instance.out_port).unwrap();
        assert_eq!(out_port.target, Some(instance.output_interface));

        let intf = ctx.hierarchy.interface(instance.output_interface).unwrap();
        assert_eq!(intf.producer, Some(instance.out_port));
    }

    #[test]
    fn literal_argument_is_wrapped_by_typing_rule() {
        assert_eq!(wrap_literal_arg(0), HwType::uint(1));
        assert_eq!(wrap_literal_arg(-1), HwType::int(1));
    }

    #[test]
    fn mutually_referential_argument_types_report_non_convergence() {
        // Two arguments whose types template-reference each other by the
        // other's own parameter name never reach a fixed point -- each pass
        // nests the reference one level deeper instead of resolving it.
        // This must surface as InferenceDidNotConverge, not
        // GearTypeNotSpecified (which implies a fixed point was reached,
        // just not a fully concrete one).
        use hwgears_core::types::TypeArg;

        let mut ctx = ElaborationContext::new();
        let def = GearDef {
            name: "cyclic".to_string(),
            params: vec![
                GearParam { name: "p1".to_string(), dtype: HwType::Any, accepts_literal: false },
                GearParam { name: "p2".to_string(), dtype: HwType::Any, accepts_literal: false },
            ],
            enablement: Box::new(|_| true),
            output: Box::new(|types| types[0].clone()),
        };
        let p1_actual = HwType::Uint(Box::new(TypeArg::Template("p2".into())));
        let p2_actual = HwType::Uint(Box::new(TypeArg::Template("p1".into())));
        let result = instantiate(
            &mut ctx,
            &def,
            &[GearArg::Interface(p1_actual), GearArg::Interface(p2_actual)],
        );
        assert!(matches!(result, Err(ElabError::InferenceDidNotConverge { .. })));
    }
}
