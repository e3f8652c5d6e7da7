//! Specialisation of modules instantiated with compile-time arguments.
//!
//! `node osc = Osc (4, 0.5f);` clones `Osc` as `Osc_specialised_1`, binds
//! its parameters to the arguments and points the instance at the clone.
//! Instances with the same source and the same arguments share one clone.

use crate::errors;
use resonate_common::{ContentHash, InternalError};
use resonate_config::BuildSettings;
use resonate_diagnostics::Diagnostic;
use resonate_ir::{
    specialise_module, InstanceId, ModuleId, Program, TypeRules, Value, VariableRole,
};
use std::collections::HashMap;
use tracing::debug;

/// Suffix placed between a module's name and the specialisation number.
pub const SPECIALISED_SUFFIX: &str = "_specialised_";

/// Replaces every instance that passes specialisation arguments with an
/// instance of a specialised copy of its source module.
///
/// Modules created here are visited too, so graphs that are themselves
/// specialised get their own instances specialised.
pub fn specialise_instances(program: &mut Program, settings: &BuildSettings) -> Result<(), Diagnostic> {
    let mut cache: HashMap<ContentHash, ModuleId> = HashMap::new();
    let mut index = 0;
    while index < program.modules.len() {
        let graph = ModuleId::from_raw(index as u32);
        index += 1;
        if !program.modules[graph].is_graph() {
            continue;
        }
        let pending: Vec<InstanceId> = program.modules[graph]
            .instances
            .iter()
            .filter(|(_, i)| !i.specialisation_args.is_empty())
            .map(|(id, _)| id)
            .collect();

        for instance in pending {
            let target = specialise_instance(program, graph, instance, settings, &mut cache)?;
            let name = program.modules[target].full_name.clone();
            let node = &mut program.modules[graph].instances[instance];
            node.source_name = name;
            node.specialisation_args.clear();
        }
    }
    Ok(())
}

fn specialise_instance(
    program: &mut Program,
    graph: ModuleId,
    instance: InstanceId,
    settings: &BuildSettings,
    cache: &mut HashMap<ContentHash, ModuleId>,
) -> Result<ModuleId, Diagnostic> {
    let node = &program.modules[graph].instances[instance];
    let span = node.span;
    let source = program
        .find_module(&node.source_name)
        .ok_or_else(|| errors::cannot_find_processor(&node.source_name, span))?;
    let params = &program.modules[source].specialisation_params;
    if params.len() != node.specialisation_args.len() {
        return Err(errors::wrong_number_of_specialisation_args(
            &program.modules[source].full_name,
            params.len(),
            node.specialisation_args.len(),
            span,
        ));
    }

    let mut bound = Vec::with_capacity(params.len());
    for (param, arg) in params.iter().zip(&node.specialisation_args) {
        let variable = &program.variables[*param];
        let value = program.constant(*arg);
        if !TypeRules::can_silently_cast(&variable.ty, &value.ty()) {
            return Err(errors::wrong_type_for_specialisation_argument(
                &variable.name,
                &program.type_description(&variable.ty),
                &program.type_description(&value.ty()),
                span,
            ));
        }
        bound.push(value.cast_to(&variable.ty).unwrap_or_else(|| value.clone()));
    }

    let key = specialisation_key(source, &bound)?;
    if let Some(&existing) = cache.get(&key) {
        return Ok(existing);
    }
    if cache.len() >= settings.max_specialisation_instances as usize {
        return Err(errors::too_many_specialisations(
            settings.max_specialisation_instances,
            span,
        ));
    }

    let name = specialised_name(program, &program.modules[source].full_name);
    let module = specialise_module(program, source, &name)?;

    let params = std::mem::take(&mut program.modules[module].specialisation_params);
    for (param, value) in params.iter().zip(bound) {
        let constant = program.intern(value);
        let variable = &mut program.variables[*param];
        variable.role = VariableRole::Constant;
        variable.initial_value = Some(constant);
    }
    let specialised = &mut program.modules[module];
    let state = std::mem::take(&mut specialised.state_variables);
    specialised.state_variables = params.into_iter().chain(state).collect();

    debug!(module = %name, "specialised module");
    cache.insert(key, module);
    Ok(module)
}

/// Hashes the source module together with the bincode encoding of the bound
/// argument values.
fn specialisation_key(source: ModuleId, args: &[Value]) -> Result<ContentHash, Diagnostic> {
    let bytes = bincode::serde::encode_to_vec((source.as_raw(), args), bincode::config::standard())
        .map_err(|e| InternalError::new(format!("cannot encode specialisation arguments: {e}")))?;
    Ok(ContentHash::from_bytes(&bytes))
}

fn specialised_name(program: &Program, base: &str) -> String {
    (1..)
        .map(|n| format!("{base}{SPECIALISED_SUFFIX}{n}"))
        .find(|candidate| program.find_module(candidate).is_none())
        .unwrap_or_else(|| format!("{base}{SPECIALISED_SUFFIX}"))
}
