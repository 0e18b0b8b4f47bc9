//! Interface listing handed to the code generator and to dependent modules.
//!
//! ```text
//! ("ju_int_add")
//! fact (n: Int) : Fn(Int, Int) "fn_u0"
//! 1
//! ```
//!
//! One line per runtime function called from a finished instance, one per
//! finished instance, then the number of generated unit names so a dependent
//! module can continue the numbering. Lambdas and the entry point are not listed.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use serde::Serialize;

use crate::env::{GlobalEnv, InstanceState, OverloadBody, OverloadOrigin};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InfoEntry {
    /// A runtime-library function referenced by some instance.
    External { internal_name: String },
    Instance {
        name: String,
        /// Declared signature of the overload the instance came from.
        signature: String,
        /// `Fn(params..., ret)` of the instance itself.
        fn_type: String,
        internal_name: String,
    },
}

/// Everything `render` would print, in order, minus the trailing counter.
pub fn entries(env: &GlobalEnv) -> Vec<InfoEntry> {
    let mut externals = BTreeSet::new();
    let mut instances = Vec::new();
    for (id, inst) in env.instances() {
        if inst.state != InstanceState::Finished {
            continue;
        }
        let overload = env.overload(inst.overload);
        if matches!(overload.body, OverloadBody::Extern { .. }) {
            continue;
        }
        let unit = env.unit_of(id);
        for &callee in unit.resolutions.values() {
            let target = env.overload(env.instance(callee).overload);
            if matches!(target.body, OverloadBody::Extern { .. }) {
                externals.insert(env.unit_of(callee).internal_name.clone());
            }
        }
        if matches!(
            overload.origin,
            OverloadOrigin::Lambda | OverloadOrigin::Entry
        ) {
            continue;
        }
        instances.push(InfoEntry::Instance {
            name: overload.name.clone(),
            signature: overload.signature.to_string(),
            fn_type: jup_types::display_type(&inst.fn_type()),
            internal_name: unit.internal_name.clone(),
        });
    }
    externals
        .into_iter()
        .map(|internal_name| InfoEntry::External { internal_name })
        .chain(instances)
        .collect()
}

pub fn render(env: &GlobalEnv) -> String {
    let mut out = String::new();
    for entry in entries(env) {
        match entry {
            InfoEntry::External { internal_name } => {
                let _ = writeln!(out, "(\"{internal_name}\")");
            }
            InfoEntry::Instance {
                name,
                signature,
                fn_type,
                internal_name,
            } => {
                let _ = writeln!(out, "{name} {signature} : {fn_type} \"{internal_name}\"");
            }
        }
    }
    let _ = writeln!(out, "{}", env.units().issued());
    out
}
