//! Global tables shared by every inference session.
//!
//! `GlobalEnv` owns the type table, the overload table with each
//! definition's append-only instance list, the compile units handed to the
//! code generator, and the store of return cells for in-flight instances.

use std::collections::BTreeMap;
use std::rc::Rc;

use jup_ast::{Expr, FnDecl, LocalSlot, Param, SiteId, Span, Spanned, TypeAnnotation};
use jup_diag::{Category, Diagnostic};
use jup_types::{
    Binder, Signature, Type, TypeVar, TypeVarId, VarSupply, display_type, freshen, freshen_with,
};

use crate::InferOptions;
use crate::span_to_location;
use crate::trace::{
    InstantiateOutcome, InstantiateStep, ResolveStep, Trace, UnifyAction, UnifyStep,
};
use crate::unify::Solution;

// ---------------------------------------------------------------------------
// Handles
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OverloadId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(pub u32);

fn index(id: u32) -> usize {
    id as usize
}

fn cell_type(cell: TypeVarId) -> Type {
    Type::var(TypeVar {
        id: cell,
        name: None,
    })
}

// ---------------------------------------------------------------------------
// Type table
// ---------------------------------------------------------------------------

/// A named type known to annotations.
#[derive(Debug, Clone)]
pub struct TypeInfo {
    pub name: String,
    /// Number of arguments, or `None` for variadic types (`Tuple`, `Fn`).
    pub arity: Option<usize>,
    /// Constructors, for user-declared types.
    pub ctors: Vec<String>,
}

/// A data constructor of a user-declared type.
#[derive(Debug, Clone)]
pub struct CtorInfo {
    pub name: String,
    pub type_name: String,
    /// Position among the type's constructors.
    pub tag: usize,
    pub fields: Vec<(String, Type)>,
    /// `TypeName(params...)`; shares its variables with `fields`.
    pub result: Type,
}

impl CtorInfo {
    /// `Fn(fields..., result)`.
    pub fn fn_type(&self) -> Type {
        Type::function(
            self.fields.iter().map(|(_, ty)| ty.clone()).collect(),
            self.result.clone(),
        )
    }
}

#[derive(Debug, Clone)]
pub struct TypeTable {
    types: BTreeMap<String, TypeInfo>,
    ctors: BTreeMap<String, CtorInfo>,
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl TypeTable {
    pub fn with_builtins() -> Self {
        let mut table = Self {
            types: BTreeMap::new(),
            ctors: BTreeMap::new(),
        };
        for name in [jup_types::INT, jup_types::REAL, jup_types::STR, jup_types::BOOL] {
            table.declare(name, Some(0));
        }
        table.declare(jup_types::LIST, Some(1));
        table.declare(jup_types::TUPLE, None);
        table.declare(jup_types::FN, None);
        table
    }

    pub fn declare(&mut self, name: impl Into<String>, arity: Option<usize>) {
        let name = name.into();
        self.types.insert(
            name.clone(),
            TypeInfo {
                name,
                arity,
                ctors: Vec::new(),
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<&TypeInfo> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn ctor(&self, name: &str) -> Option<&CtorInfo> {
        self.ctors.get(name)
    }

    pub(crate) fn add_ctor(&mut self, info: CtorInfo) {
        if let Some(ty) = self.types.get_mut(&info.type_name) {
            ty.ctors.push(info.name.clone());
        }
        self.ctors.insert(info.name.clone(), info);
    }

    /// Resolve a syntactic annotation to a semantic type.
    ///
    /// `_` becomes a fresh variable; `\a` becomes the variable recorded under
    /// `a` in `vars`, created on first use.
    pub fn resolve_annotation(
        &self,
        annotation: &Spanned<TypeAnnotation>,
        supply: &mut VarSupply,
        vars: &mut BTreeMap<String, Type>,
    ) -> Result<Type, Diagnostic> {
        self.resolve_node(&annotation.node, annotation.span, supply, vars)
    }

    fn resolve_node(
        &self,
        node: &TypeAnnotation,
        span: Span,
        supply: &mut VarSupply,
        vars: &mut BTreeMap<String, Type>,
    ) -> Result<Type, Diagnostic> {
        match node {
            TypeAnnotation::Wildcard => Ok(supply.fresh()),
            TypeAnnotation::Var(name) => Ok(vars
                .entry(name.clone())
                .or_insert_with(|| Type::var(supply.fresh_named_var(name.clone())))
                .clone()),
            TypeAnnotation::Named(name, args) => {
                let Some(info) = self.get(name) else {
                    return Err(Diagnostic::error(
                        Category::UndefinedType,
                        format!("undefined type `{name}`"),
                    )
                    .at(span_to_location(span)));
                };
                if let Some(arity) = info.arity.filter(|&arity| arity != args.len()) {
                    return Err(Diagnostic::error(
                        Category::MalformedTypeArity,
                        format!(
                            "type `{name}` expects {arity} argument{}, found {}",
                            if arity == 1 { "" } else { "s" },
                            args.len()
                        ),
                    )
                    .at(span_to_location(span)));
                }
                let args = args
                    .iter()
                    .map(|arg| self.resolve_node(arg, span, supply, vars))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Type::concrete(name.clone(), args))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Overloads and instances
// ---------------------------------------------------------------------------

/// Where an overload came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverloadOrigin {
    /// Written by the user.
    Declared,
    /// Constructor, tag check or field getter of a user type.
    Generated,
    /// Lifted lambda.
    Lambda,
    /// Implemented by the runtime library.
    Extern,
    /// The synthetic `#entry` definition.
    Entry,
}

/// Body of a source overload, shared between the table and running sessions.
#[derive(Debug, Clone)]
pub struct SourceBody {
    pub params: Vec<Param>,
    /// Locals captured by a lambda, fixed at their types when it was created.
    pub captures: Vec<(LocalSlot, Type)>,
    pub body: Expr,
}

#[derive(Debug, Clone)]
pub enum OverloadBody {
    Source(Rc<SourceBody>),
    Extern { ret: Type, internal_name: String },
}

/// One definition of a (possibly overloaded) global name.
#[derive(Debug, Clone)]
pub struct Overload {
    pub name: String,
    /// Declared parameters; unannotated ones are variables.
    pub signature: Signature,
    pub body: OverloadBody,
    pub origin: OverloadOrigin,
    pub span: Span,
    /// Append-only list of instances made from this definition.
    pub instances: Vec<InstanceId>,
}

#[derive(Debug, Clone)]
pub struct GlobalFunc {
    pub name: String,
    pub overloads: Vec<OverloadId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    /// Its body is being inferred.
    Pending,
    Finished,
    /// Inference failed; never returned from the cache again.
    Failed,
}

/// One monomorphic specialization of an overload.
#[derive(Debug, Clone)]
pub struct FuncInstance {
    pub overload: OverloadId,
    pub signature: Signature,
    /// The return cell variable while pending, the resolved type afterwards.
    /// Read through `cell` until the instance is settled.
    pub ret: Type,
    pub cell: TypeVarId,
    pub unit: UnitId,
    pub state: InstanceState,
}

impl FuncInstance {
    pub fn is_finished(&self) -> bool {
        self.state == InstanceState::Finished
    }

    /// `Fn(signature params..., ret)`.
    pub fn fn_type(&self) -> Type {
        self.signature.fn_type(self.ret.clone())
    }
}

// ---------------------------------------------------------------------------
// Compile units
// ---------------------------------------------------------------------------

/// The code-generator-facing record of one instance.
#[derive(Debug, Clone)]
pub struct CompileUnit {
    pub id: UnitId,
    pub internal_name: String,
    pub instance: InstanceId,
    /// Instance chosen for every overloaded reference in the body.
    pub resolutions: BTreeMap<SiteId, InstanceId>,
}

#[derive(Debug, Clone, Default)]
pub struct UnitTable {
    prefix: String,
    next_name: u32,
    units: Vec<CompileUnit>,
}

impl UnitTable {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next_name: 0,
            units: Vec::new(),
        }
    }

    /// A unit with a fresh `<prefix>fn_u<N>` name.
    pub fn create(&mut self, instance: InstanceId) -> UnitId {
        let name = format!("{}fn_u{}", self.prefix, self.next_name);
        self.next_name += 1;
        self.push(instance, name)
    }

    /// A unit for a runtime-provided function, keeping its name.
    pub fn bake(&mut self, instance: InstanceId, internal_name: impl Into<String>) -> UnitId {
        self.push(instance, internal_name.into())
    }

    fn push(&mut self, instance: InstanceId, internal_name: String) -> UnitId {
        let id = UnitId(self.units.len() as u32);
        self.units.push(CompileUnit {
            id,
            internal_name,
            instance,
            resolutions: BTreeMap::new(),
        });
        id
    }

    pub fn get(&self, id: UnitId) -> &CompileUnit {
        &self.units[index(id.0)]
    }

    pub(crate) fn get_mut(&mut self, id: UnitId) -> &mut CompileUnit {
        &mut self.units[index(id.0)]
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompileUnit> {
        self.units.iter()
    }

    /// Number of generated `fn_u<N>` names handed out so far.
    pub fn issued(&self) -> u32 {
        self.next_name
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Return cells
// ---------------------------------------------------------------------------

/// Resolved return types of in-flight (and finished) instances, keyed by
/// their return cell variable.
#[derive(Debug, Clone, Default)]
pub struct CellStore {
    cells: BTreeMap<TypeVarId, Type>,
}

impl CellStore {
    pub fn get(&self, cell: TypeVarId) -> Option<&Type> {
        self.cells.get(&cell)
    }

    pub fn set(&mut self, cell: TypeVarId, ty: Type) {
        self.cells.insert(cell, ty);
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }
}

// ---------------------------------------------------------------------------
// Global environment
// ---------------------------------------------------------------------------

pub struct GlobalEnv {
    pub(crate) options: InferOptions,
    pub(crate) supply: VarSupply,
    pub types: TypeTable,
    funcs: BTreeMap<String, GlobalFunc>,
    overloads: Vec<Overload>,
    instances: Vec<FuncInstance>,
    pub(crate) units: UnitTable,
    pub(crate) cells: CellStore,
    /// Instances whose bodies are being inferred, innermost last.
    pending: Vec<InstanceId>,
    /// Finished instances whose return type still depends on `pending`.
    unsettled: Vec<InstanceId>,
    lambda_count: u32,
    trace: Trace,
}

impl Default for GlobalEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl GlobalEnv {
    pub fn new() -> Self {
        Self::with_options(InferOptions::default())
    }

    pub fn with_options(options: InferOptions) -> Self {
        let units = UnitTable::new(options.unit_prefix.clone());
        Self {
            options,
            supply: VarSupply::new(),
            types: TypeTable::with_builtins(),
            funcs: BTreeMap::new(),
            overloads: Vec::new(),
            instances: Vec::new(),
            units,
            cells: CellStore::default(),
            pending: Vec::new(),
            unsettled: Vec::new(),
            lambda_count: 0,
            trace: Trace::default(),
        }
    }

    pub fn options(&self) -> &InferOptions {
        &self.options
    }

    pub fn fresh(&mut self) -> Type {
        self.supply.fresh()
    }

    pub fn fresh_named(&mut self, name: impl Into<String>) -> Type {
        Type::var(self.supply.fresh_named_var(name))
    }

    // -- lookups ------------------------------------------------------------

    pub fn func(&self, name: &str) -> Option<&GlobalFunc> {
        self.funcs.get(name)
    }

    pub fn has_func(&self, name: &str) -> bool {
        self.funcs.contains_key(name)
    }

    pub fn funcs(&self) -> impl Iterator<Item = &GlobalFunc> {
        self.funcs.values()
    }

    pub fn overload(&self, id: OverloadId) -> &Overload {
        &self.overloads[index(id.0)]
    }

    pub fn overloads(&self) -> impl Iterator<Item = (OverloadId, &Overload)> {
        self.overloads
            .iter()
            .enumerate()
            .map(|(i, ov)| (OverloadId(i as u32), ov))
    }

    pub fn instance(&self, id: InstanceId) -> &FuncInstance {
        &self.instances[index(id.0)]
    }

    pub(crate) fn instance_mut(&mut self, id: InstanceId) -> &mut FuncInstance {
        &mut self.instances[index(id.0)]
    }

    pub fn instances(&self) -> impl Iterator<Item = (InstanceId, &FuncInstance)> {
        self.instances
            .iter()
            .enumerate()
            .map(|(i, inst)| (InstanceId(i as u32), inst))
    }

    pub fn units(&self) -> &UnitTable {
        &self.units
    }

    pub fn unit(&self, id: UnitId) -> &CompileUnit {
        self.units.get(id)
    }

    /// The compile unit of an instance.
    pub fn unit_of(&self, id: InstanceId) -> &CompileUnit {
        self.units.get(self.instance(id).unit)
    }

    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    // -- registration -------------------------------------------------------

    pub(crate) fn add_overload(&mut self, overload: Overload) -> OverloadId {
        let id = OverloadId(self.overloads.len() as u32);
        self.funcs
            .entry(overload.name.clone())
            .or_insert_with(|| GlobalFunc {
                name: overload.name.clone(),
                overloads: Vec::new(),
            })
            .overloads
            .push(id);
        self.overloads.push(overload);
        id
    }

    /// Build a declared signature from parameter annotations.
    ///
    /// Unannotated parameters get a fresh variable; `\a` names are shared
    /// across the whole signature.
    pub(crate) fn declared_signature(
        &mut self,
        params: &[Param],
        span: Span,
    ) -> Result<Signature, Diagnostic> {
        let mut vars = BTreeMap::new();
        let mut typed = Vec::with_capacity(params.len());
        for param in params {
            let ty = match &param.annotation {
                Some(annotation) => {
                    self.types
                        .resolve_annotation(annotation, &mut self.supply, &mut vars)?
                }
                None => self.supply.fresh(),
            };
            typed.push((param.name.clone(), ty));
        }
        Ok(Signature::new(typed, span))
    }

    /// Register a user-written function as a new overload of its name.
    pub fn register_function(&mut self, decl: &FnDecl) -> Result<OverloadId, Diagnostic> {
        self.register_source(decl, OverloadOrigin::Declared)
    }

    pub(crate) fn register_source(
        &mut self,
        decl: &FnDecl,
        origin: OverloadOrigin,
    ) -> Result<OverloadId, Diagnostic> {
        let signature = self.declared_signature(&decl.params, decl.span)?;
        let body = SourceBody {
            params: decl.params.clone(),
            captures: Vec::new(),
            body: decl.body.clone(),
        };
        Ok(self.add_overload(Overload {
            name: decl.name.clone(),
            signature,
            body: OverloadBody::Source(Rc::new(body)),
            origin,
            span: decl.span,
            instances: Vec::new(),
        }))
    }

    /// Register an overload implemented by the runtime library.
    ///
    /// Variables in `params` and `ret` are shared: `ret` is specialised by
    /// matching `params` against each call signature.
    pub fn register_extern(
        &mut self,
        name: impl Into<String>,
        params: Vec<(String, Type)>,
        ret: Type,
        internal_name: impl Into<String>,
    ) -> OverloadId {
        self.add_overload(Overload {
            name: name.into(),
            signature: Signature::new(params, Span::synthetic()),
            body: OverloadBody::Extern {
                ret,
                internal_name: internal_name.into(),
            },
            origin: OverloadOrigin::Extern,
            span: Span::synthetic(),
            instances: Vec::new(),
        })
    }

    /// Register a lambda as a synthetic global and return its name.
    pub(crate) fn register_lambda(
        &mut self,
        signature: Signature,
        body: SourceBody,
        span: Span,
    ) -> String {
        let name = format!("<lambda#{}>", self.lambda_count);
        self.lambda_count += 1;
        self.add_overload(Overload {
            name: name.clone(),
            signature,
            body: OverloadBody::Source(Rc::new(body)),
            origin: OverloadOrigin::Lambda,
            span,
            instances: Vec::new(),
        });
        name
    }

    /// The overload's function type with fresh variables.
    ///
    /// Source definitions get a fresh return variable; externs keep their
    /// declared return type (renamed together with the parameters).
    pub(crate) fn candidate_type(&mut self, id: OverloadId) -> Type {
        let overload = &self.overloads[index(id.0)];
        let declared_ret = match &overload.body {
            OverloadBody::Extern { ret, .. } => Some(ret.clone()),
            OverloadBody::Source(_) => None,
        };
        let params: Vec<Type> = overload.signature.param_types().cloned().collect();
        let ret = declared_ret.unwrap_or_else(|| self.supply.fresh());
        freshen(&Type::function(params, ret), &mut self.supply)
    }

    // -- instances ----------------------------------------------------------

    /// Cached, non-failed instance of `overload` for an alpha-equivalent
    /// signature.
    pub fn find_instance(&self, overload: OverloadId, signature: &Signature) -> Option<InstanceId> {
        self.overload(overload)
            .instances
            .iter()
            .copied()
            .find(|&id| {
                let inst = self.instance(id);
                inst.state != InstanceState::Failed && inst.signature.alpha_equivalent(signature)
            })
    }

    /// Append a new instance record to `overload`.
    pub(crate) fn push_instance(
        &mut self,
        overload: OverloadId,
        signature: Signature,
        ret: Type,
        cell: TypeVarId,
        state: InstanceState,
    ) -> InstanceId {
        let id = InstanceId(self.instances.len() as u32);
        let unit = match &self.overload(overload).body {
            OverloadBody::Extern { internal_name, .. } => {
                let internal_name = internal_name.clone();
                self.units.bake(id, internal_name)
            }
            OverloadBody::Source(_) => self.units.create(id),
        };
        self.instances.push(FuncInstance {
            overload,
            signature,
            ret,
            cell,
            unit,
            state,
        });
        self.overloads[index(overload.0)].instances.push(id);
        if state == InstanceState::Pending {
            self.pending.push(id);
        }
        id
    }

    /// Record the final return type and site resolutions of an instance.
    ///
    /// While another instance is still in flight the result may mention its
    /// return cell; the instance then stays unsettled and keeps reading its
    /// return type through its own cell until the outermost instance is done.
    pub(crate) fn finish_instance(
        &mut self,
        id: InstanceId,
        ret: Type,
        resolutions: BTreeMap<SiteId, InstanceId>,
    ) {
        let inst = self.instance_mut(id);
        inst.ret = ret.clone();
        inst.state = InstanceState::Finished;
        let (cell, unit) = (inst.cell, inst.unit);
        if ret.as_var().is_none_or(|v| v.id != cell) {
            self.cells.set(cell, ret.clone());
        }
        self.units.get_mut(unit).resolutions = resolutions;
        self.pending.retain(|&p| p != id);
        if self.pending.is_empty() {
            self.settle();
        } else if ret.contains_var() {
            self.unsettled.push(id);
        }
    }

    /// Mark every instance from `first` onwards as failed.
    ///
    /// Instances finished during a failed attempt may depend on the return
    /// cell of the instance that failed, so none of them is kept.
    pub(crate) fn fail_instances_from(&mut self, first: InstanceId) {
        for inst in &mut self.instances[index(first.0)..] {
            inst.state = InstanceState::Failed;
        }
        self.pending.retain(|&p| p < first);
        self.unsettled.retain(|&u| u < first);
        if self.pending.is_empty() {
            self.settle();
        }
    }

    /// Read the final return type of every unsettled instance off the cells.
    fn settle(&mut self) {
        for id in std::mem::take(&mut self.unsettled) {
            let cell = self.instance(id).cell;
            let ret = Solution::default().resolve(&self.cells, &cell_type(cell));
            if ret.as_var().is_none_or(|v| v.id != cell) {
                self.cells.set(cell, ret.clone());
            }
            self.instance_mut(id).ret = ret;
        }
    }

    pub fn pending(&self) -> &[InstanceId] {
        &self.pending
    }

    /// Instances whose body is finished but whose return type may still be
    /// refined by an instance in flight.
    pub fn unsettled(&self) -> &[InstanceId] {
        &self.unsettled
    }

    fn is_open(&self, id: InstanceId) -> bool {
        self.pending.contains(&id) || self.unsettled.contains(&id)
    }

    /// Publish what a session learned about open return cells.
    ///
    /// Every open cell the session's substitution binds, or that already has
    /// a stored value, is re-resolved under the session and stored.
    pub(crate) fn commit_cells(&mut self, solution: &Solution) {
        let cells: Vec<TypeVarId> = self
            .pending
            .iter()
            .chain(&self.unsettled)
            .map(|&id| self.instance(id).cell)
            .filter(|&cell| {
                solution.subst.is_bound(Binder::Var(cell)) || self.cells.get(cell).is_some()
            })
            .collect();
        for cell in cells {
            let resolved = solution.resolve(&self.cells, &cell_type(cell));
            if resolved.as_var().is_some_and(|v| v.id == cell) {
                continue;
            }
            self.cells.set(cell, resolved);
        }
    }

    /// The function type a call site sees for an instance.
    ///
    /// Parameters are always renamed. The return type of an open instance
    /// is its shared return cell, so callers and the instance learn about
    /// each other; a settled instance's return type is renamed too.
    pub(crate) fn instance_fn_type(&mut self, id: InstanceId) -> Type {
        let inst = self.instance(id);
        if self.is_open(id) {
            let cell = inst.cell;
            let fn_type = inst.signature.fn_type(cell_type(cell));
            let mut mapping = BTreeMap::from([(cell, cell_type(cell))]);
            freshen_with(&fn_type, &mut self.supply, &mut mapping)
        } else {
            let fn_type = inst.fn_type();
            freshen(&fn_type, &mut self.supply)
        }
    }

    // -- tracing ------------------------------------------------------------

    pub(crate) fn tracing(&self) -> bool {
        self.options.trace
    }

    pub(crate) fn record_unify(&mut self, action: UnifyAction, left: &Type, right: &Type) {
        if !self.tracing() {
            return;
        }
        let mut shown = jup_types::display_types(&[left, right]).into_iter();
        let left = shown.next().unwrap_or_default();
        let right = shown.next().unwrap_or_default();
        let step = self.trace.unify.len();
        self.trace.unify.push(UnifyStep {
            step,
            action,
            left,
            right,
        });
    }

    pub(crate) fn record_resolve(&mut self, step: ResolveStep) {
        if self.tracing() {
            self.trace.resolve.push(step);
        }
    }

    pub(crate) fn record_instantiate(
        &mut self,
        overload: OverloadId,
        signature: &Signature,
        outcome: InstantiateOutcome,
        ret: Option<&Type>,
    ) {
        if !self.tracing() {
            return;
        }
        self.trace.instantiate.push(InstantiateStep {
            function: self.overload(overload).name.clone(),
            signature: signature.to_string(),
            outcome,
            ret: ret.map(display_type),
        });
    }

    pub fn clear_trace(&mut self) {
        self.trace = Trace::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jup_ast::{ExprKind, FileId, Lit};

    fn sp() -> Span {
        Span::new(FileId(0), 0, 1)
    }

    fn ann(node: TypeAnnotation) -> Spanned<TypeAnnotation> {
        Spanned::new(node, sp())
    }

    fn param(name: &str, slot: u32, annotation: Option<TypeAnnotation>) -> Param {
        Param {
            name: name.into(),
            slot: LocalSlot(slot),
            annotation: annotation.map(ann),
            span: sp(),
        }
    }

    #[test]
    fn builtin_types_have_expected_arity() {
        let table = TypeTable::with_builtins();
        assert_eq!(table.get("Int").and_then(|t| t.arity), Some(0));
        assert_eq!(table.get("List").and_then(|t| t.arity), Some(1));
        assert_eq!(table.get("Tuple").map(|t| t.arity), Some(None));
        assert!(table.get("Map").is_none());
    }

    #[test]
    fn annotation_variables_are_shared_by_name() {
        let table = TypeTable::with_builtins();
        let mut supply = VarSupply::new();
        let mut vars = BTreeMap::new();
        let ty = table
            .resolve_annotation(
                &ann(TypeAnnotation::applied(
                    "Fn",
                    vec![TypeAnnotation::var("a"), TypeAnnotation::var("a")],
                )),
                &mut supply,
                &mut vars,
            )
            .expect("resolves");
        let (params, ret) = ty.as_function().expect("function");
        assert_eq!(&params[0], ret);
        assert_eq!(vars.len(), 1);
    }

    #[test]
    fn wildcards_are_distinct_variables() {
        let table = TypeTable::with_builtins();
        let mut supply = VarSupply::new();
        let ty = table
            .resolve_annotation(
                &ann(TypeAnnotation::applied(
                    "Tuple",
                    vec![TypeAnnotation::Wildcard, TypeAnnotation::Wildcard],
                )),
                &mut supply,
                &mut BTreeMap::new(),
            )
            .expect("resolves");
        let (_, args) = ty.as_concrete().expect("concrete");
        assert!(args[0].is_var() && args[1].is_var());
        assert_ne!(args[0], args[1]);
    }

    #[test]
    fn annotation_arity_is_checked() {
        let table = TypeTable::with_builtins();
        let err = table
            .resolve_annotation(
                &ann(TypeAnnotation::applied(
                    "List",
                    vec![TypeAnnotation::named("Int"), TypeAnnotation::named("Int")],
                )),
                &mut VarSupply::new(),
                &mut BTreeMap::new(),
            )
            .expect_err("arity error");
        assert_eq!(err.category, Category::MalformedTypeArity);
        assert_eq!(err.message, "type `List` expects 1 argument, found 2");
    }

    #[test]
    fn unknown_annotation_type_is_reported() {
        let table = TypeTable::with_builtins();
        let err = table
            .resolve_annotation(
                &ann(TypeAnnotation::named("Widget")),
                &mut VarSupply::new(),
                &mut BTreeMap::new(),
            )
            .expect_err("unknown type");
        assert_eq!(err.category, Category::UndefinedType);
        assert_eq!(err.location, Some(span_to_location(sp())));
    }

    #[test]
    fn unit_names_are_unique_and_prefixed() {
        let mut units = UnitTable::new("core.");
        let a = units.create(InstanceId(0));
        let b = units.bake(InstanceId(1), "ju_int_add");
        let c = units.create(InstanceId(2));
        assert_eq!(units.get(a).internal_name, "core.fn_u0");
        assert_eq!(units.get(b).internal_name, "ju_int_add");
        assert_eq!(units.get(c).internal_name, "core.fn_u1");
    }

    #[test]
    fn overloads_accumulate_under_one_name() {
        let mut env = GlobalEnv::new();
        let body = Spanned::new(ExprKind::Lit(Lit::Int(0)), sp());
        for annotation in [TypeAnnotation::named("Int"), TypeAnnotation::named("Str")] {
            env.register_function(&FnDecl {
                name: "f".into(),
                params: vec![param("x", 0, Some(annotation))],
                body: body.clone(),
                span: sp(),
            })
            .expect("registers");
        }
        let func = env.func("f").expect("f exists");
        assert_eq!(func.overloads.len(), 2);
        assert_eq!(
            env.overload(func.overloads[1]).signature.params[0].1,
            Type::str()
        );
    }

    #[test]
    fn unannotated_params_are_generic() {
        let mut env = GlobalEnv::new();
        let sig = env
            .declared_signature(&[param("x", 0, None), param("y", 1, None)], sp())
            .expect("signature");
        assert!(sig.params[0].1.is_var());
        assert!(sig.params[1].1.is_var());
        assert_ne!(sig.params[0].1, sig.params[1].1);
    }

    #[test]
    fn extern_candidates_keep_declared_return() {
        let mut env = GlobalEnv::new();
        let a = env.fresh_named("a");
        let id = env.register_extern(
            "first",
            vec![("xs".into(), Type::list(a.clone()))],
            a,
            "ju_first",
        );
        let candidate = env.candidate_type(id);
        let (params, ret) = candidate.as_function().expect("function");
        assert_eq!(params[0], Type::list(ret.clone()));
    }
}
