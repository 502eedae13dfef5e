//! Declaration-based type oracle.
//!
//! This is not a type checker. It reads explicit annotations (variables,
//! parameters, function signatures, class fields, type aliases, interfaces)
//! and derives enough of an expression's type to answer the nullability and
//! primitive-category questions the optional-chain rule asks. Anything it
//! cannot resolve is `any`, which is how an unresolved name behaves in the
//! host language as well.

use crate::rules::util::{
    access_object, assertion_inner, binary_parts, contains_optional_chain, first_expr_child,
    has_optional_token, is_paren, member_property, slice, string_literal_value, subscript_index,
    unary_parts, walk,
};
use std::collections::HashMap;
use tree_sitter::Node;

const MAX_RESOLVE_DEPTH: usize = 16;

/// Structural type as far as declarations reveal it.
#[derive(Debug, Clone, PartialEq)]
pub enum Ty {
    Any,
    Unknown,
    Never,
    Void,
    Null,
    Undefined,
    Boolean,
    Number,
    String,
    BigInt,
    Symbol,
    BoolLit(bool),
    NumLit(f64),
    StrLit(String),
    BigIntLit(String),
    Object(ObjectTy),
    Function(Box<Ty>),
    Array(Box<Ty>),
    Union(Vec<Ty>),
    /// A named type whose members are not known (library types, classes
    /// from other files). Never nullish.
    Opaque,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectTy {
    pub props: Vec<Prop>,
    pub index: Option<Box<Ty>>,
    pub call: Option<Box<Ty>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prop {
    pub name: String,
    pub ty: Ty,
    pub optional: bool,
}

impl Ty {
    /// Builds a union, flattening nested unions. `any` and `unknown` absorb
    /// every other member.
    pub fn union(members: impl IntoIterator<Item = Ty>) -> Ty {
        let mut flat: Vec<Ty> = Vec::new();
        for member in members {
            match member {
                Ty::Union(inner) => {
                    for ty in inner {
                        push_unique(&mut flat, ty);
                    }
                }
                Ty::Never => {}
                other => push_unique(&mut flat, other),
            }
        }
        if flat.iter().any(|t| matches!(t, Ty::Any)) {
            return Ty::Any;
        }
        if flat.iter().any(|t| matches!(t, Ty::Unknown)) {
            return Ty::Unknown;
        }
        match flat.len() {
            0 => Ty::Never,
            1 => flat.pop().unwrap_or(Ty::Never),
            _ => Ty::Union(flat),
        }
    }

    pub fn parts(&self) -> &[Ty] {
        match self {
            Ty::Union(parts) => parts,
            other => std::slice::from_ref(other),
        }
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Ty::Null | Ty::Undefined)
    }

    pub fn strip_nullish(&self) -> Ty {
        Ty::union(self.parts().iter().filter(|t| !t.is_nullish()).cloned())
    }

    pub fn includes_nullish(&self) -> bool {
        self.parts().iter().any(Ty::is_nullish)
    }

    /// Literal types widen to their primitive (`let x = 1` is `number`).
    pub fn widen(self) -> Ty {
        match self {
            Ty::BoolLit(_) => Ty::Boolean,
            Ty::NumLit(_) => Ty::Number,
            Ty::StrLit(_) => Ty::String,
            Ty::BigIntLit(_) => Ty::BigInt,
            other => other,
        }
    }
}

fn push_unique(flat: &mut Vec<Ty>, ty: Ty) {
    if !flat.contains(&ty) {
        flat.push(ty);
    }
}

/// Summary flags over the union members of a type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TypeInfo {
    pub has_null: bool,
    pub has_undefined: bool,
    pub has_void: bool,
    pub has_any: bool,
    pub has_unknown: bool,
    pub boolean_like: bool,
    pub number_like: bool,
    pub string_like: bool,
    pub big_int_like: bool,
    /// A member that is falsy without being nullish: `false`, `0`, `""`,
    /// `0n` literals, or the wide `boolean` (which contains `false`).
    pub has_falsy_literal: bool,
    pub only_any_or_unknown: bool,
}

impl TypeInfo {
    pub fn of(ty: &Ty) -> Self {
        let mut info = TypeInfo::default();
        let parts = ty.parts();
        for part in parts {
            match part {
                Ty::Any => info.has_any = true,
                Ty::Unknown => info.has_unknown = true,
                Ty::Null => info.has_null = true,
                Ty::Undefined => info.has_undefined = true,
                Ty::Void => info.has_void = true,
                Ty::Boolean => {
                    info.boolean_like = true;
                    info.has_falsy_literal = true;
                }
                Ty::BoolLit(value) => {
                    info.boolean_like = true;
                    info.has_falsy_literal |= !value;
                }
                Ty::Number => info.number_like = true,
                Ty::NumLit(value) => {
                    info.number_like = true;
                    info.has_falsy_literal |= *value == 0.0 || value.is_nan();
                }
                Ty::String => info.string_like = true,
                Ty::StrLit(value) => {
                    info.string_like = true;
                    info.has_falsy_literal |= value.is_empty();
                }
                Ty::BigInt => info.big_int_like = true,
                Ty::BigIntLit(digits) => {
                    info.big_int_like = true;
                    info.has_falsy_literal |= digits.trim_start_matches('0').is_empty();
                }
                Ty::Never
                | Ty::Symbol
                | Ty::Object(_)
                | Ty::Function(_)
                | Ty::Array(_)
                | Ty::Union(_)
                | Ty::Opaque => {}
            }
        }
        info.only_any_or_unknown = !parts.is_empty()
            && parts.iter().all(|p| matches!(p, Ty::Any | Ty::Unknown));
        info
    }

    /// Null or undefined, counting `any`/`unknown` as possibly nullish.
    pub fn includes_nullish(&self) -> bool {
        self.has_null || self.has_undefined || self.has_any || self.has_unknown
    }

    /// Null or undefined as literal union members only.
    pub fn includes_explicit_nullish(&self) -> bool {
        self.has_null || self.has_undefined
    }

    pub fn is_any_or_unknown(&self) -> bool {
        self.only_any_or_unknown
    }

    pub fn includes_null(&self) -> bool {
        self.has_null || self.has_any || self.has_unknown
    }

    pub fn includes_undefined(&self) -> bool {
        self.has_undefined || self.has_any || self.has_unknown
    }

    /// Converting a truthiness guard would change the result for a falsy
    /// member that is not nullish.
    pub fn would_change_return_type(&self) -> bool {
        self.has_falsy_literal && !self.has_null && !self.has_undefined
    }

    pub fn has_void_type(&self) -> bool {
        self.has_void
    }
}

/// Type-query collaborator consumed by the rule.
pub trait TypeQuery<'t> {
    fn type_of(&self, expr: Node<'t>) -> Ty;

    fn type_info(&self, expr: Node<'t>) -> TypeInfo {
        TypeInfo::of(&self.type_of(expr))
    }
}

/// Oracle that answers every query with `any`.
#[derive(Debug, Default, Clone, Copy)]
pub struct AnyTypes;

impl<'t> TypeQuery<'t> for AnyTypes {
    fn type_of(&self, _expr: Node<'t>) -> Ty {
        Ty::Any
    }
}

#[derive(Debug, Clone, Copy)]
enum DeclKind<'t> {
    /// `name: T`
    Annotated(Node<'t>),
    /// `name?: T` parameter.
    OptionalParam(Option<Node<'t>>),
    /// `const name = value` (literal types kept) or `let`/`var` (widened).
    Inferred { value: Node<'t>, widen: bool },
    /// Function declaration or signature with its optional return type.
    Function(Option<Node<'t>>),
    Class,
    Untyped,
}

#[derive(Debug, Clone, Copy)]
struct Decl<'t> {
    scope: (usize, usize),
    kind: DeclKind<'t>,
}

#[derive(Debug, Clone, Copy)]
struct TypeDecl<'t> {
    node: Node<'t>,
    scope: (usize, usize),
}

/// Declarations of one source file, indexed by name.
pub struct DeclaredTypes<'t> {
    source: &'t str,
    values: HashMap<&'t str, Vec<Decl<'t>>>,
    types: HashMap<&'t str, Vec<TypeDecl<'t>>>,
}

type TypeEnv = HashMap<String, Ty>;

fn is_scope_kind(kind: &str) -> bool {
    matches!(
        kind,
        "program"
            | "statement_block"
            | "function_declaration"
            | "generator_function_declaration"
            | "function"
            | "function_expression"
            | "arrow_function"
            | "method_definition"
            | "class_body"
            | "for_statement"
            | "for_in_statement"
            | "module"
            | "internal_module"
    )
}

fn enclosing_scope(node: Node) -> (usize, usize) {
    let mut current = node.parent();
    while let Some(parent) = current {
        if is_scope_kind(parent.kind()) {
            return (parent.start_byte(), parent.end_byte());
        }
        current = parent.parent();
    }
    (0, usize::MAX)
}

/// The node carrying the type inside a `type_annotation` wrapper.
fn annotation_type(node: Node) -> Option<Node> {
    if node.kind() == "type_annotation" || node.kind() == "opting_type_annotation" {
        first_expr_child(node)
    } else {
        Some(node)
    }
}

impl<'t> DeclaredTypes<'t> {
    pub fn collect(root: Node<'t>, source: &'t str) -> Self {
        let mut this = Self {
            source,
            values: HashMap::new(),
            types: HashMap::new(),
        };
        walk(root, &mut |node| this.record(node));
        this
    }

    fn record(&mut self, node: Node<'t>) {
        match node.kind() {
            "variable_declarator" => {
                let Some(name) = node.child_by_field_name("name") else {
                    return;
                };
                if name.kind() != "identifier" {
                    return;
                }
                let kind = if let Some(ty) = node.child_by_field_name("type") {
                    DeclKind::Annotated(ty)
                } else if let Some(value) = node.child_by_field_name("value") {
                    let is_const = node
                        .parent()
                        .and_then(|decl| decl.child(0))
                        .is_some_and(|kw| kw.kind() == "const");
                    DeclKind::Inferred {
                        value,
                        widen: !is_const,
                    }
                } else {
                    DeclKind::Untyped
                };
                self.push_value(name, node, kind);
            }
            "required_parameter" | "optional_parameter" => {
                let Some(pattern) = node.child_by_field_name("pattern") else {
                    return;
                };
                if pattern.kind() != "identifier" {
                    return;
                }
                let ty = node.child_by_field_name("type");
                let kind = match (node.kind(), ty) {
                    ("optional_parameter", ty) => DeclKind::OptionalParam(ty),
                    (_, Some(ty)) => DeclKind::Annotated(ty),
                    (_, None) => DeclKind::Untyped,
                };
                self.push_value(pattern, node, kind);
            }
            "function_declaration" | "function_signature" | "generator_function_declaration" => {
                if let Some(name) = node.child_by_field_name("name") {
                    let ret = node.child_by_field_name("return_type");
                    self.push_value(name, node, DeclKind::Function(ret));
                }
            }
            "class_declaration" | "abstract_class_declaration" => {
                if let Some(name) = node.child_by_field_name("name") {
                    self.push_value(name, node, DeclKind::Class);
                    self.push_type(name, node);
                }
            }
            "type_alias_declaration" | "interface_declaration" => {
                if let Some(name) = node.child_by_field_name("name") {
                    self.push_type(name, node);
                }
            }
            _ => {}
        }
    }

    fn push_value(&mut self, name: Node<'t>, decl: Node<'t>, kind: DeclKind<'t>) {
        let text = slice(self.source, name);
        self.values.entry(text).or_default().push(Decl {
            scope: enclosing_scope(decl),
            kind,
        });
    }

    fn push_type(&mut self, name: Node<'t>, decl: Node<'t>) {
        let text = slice(self.source, name);
        self.types.entry(text).or_default().push(TypeDecl {
            node: decl,
            scope: enclosing_scope(decl),
        });
    }

    fn lookup_value(&self, name: &str, at: usize) -> Option<Decl<'t>> {
        innermost(self.values.get(name)?.iter().map(|d| (d.scope, *d)), at)
    }

    fn lookup_type(&self, name: &str, at: usize) -> Option<Node<'t>> {
        innermost(self.types.get(name)?.iter().map(|d| (d.scope, d.node)), at)
    }

    fn decl_type(&self, decl: Decl<'t>, depth: usize) -> Ty {
        let env = TypeEnv::new();
        match decl.kind {
            DeclKind::Annotated(ty) => self.annotation_ty(ty, &env, depth),
            DeclKind::OptionalParam(ty) => {
                let base = ty.map_or(Ty::Any, |ty| self.annotation_ty(ty, &env, depth));
                Ty::union([base, Ty::Undefined])
            }
            DeclKind::Inferred { value, widen } => {
                let ty = self.expr_ty(value, depth + 1);
                if widen { ty.widen() } else { ty }
            }
            DeclKind::Function(ret) => {
                let ret = ret.map_or(Ty::Any, |ty| self.annotation_ty(ty, &env, depth));
                Ty::Function(Box::new(ret))
            }
            DeclKind::Class => Ty::Opaque,
            DeclKind::Untyped => Ty::Any,
        }
    }

    fn annotation_ty(&self, node: Node<'t>, env: &TypeEnv, depth: usize) -> Ty {
        match annotation_type(node) {
            Some(ty) => self.resolve_type(ty, env, depth),
            None => Ty::Any,
        }
    }

    /// Resolves a type syntax node.
    fn resolve_type(&self, node: Node<'t>, env: &TypeEnv, depth: usize) -> Ty {
        if depth > MAX_RESOLVE_DEPTH {
            return Ty::Any;
        }
        let text = slice(self.source, node);
        match node.kind() {
            "type_annotation" | "parenthesized_type" | "readonly_type" => {
                match first_expr_child(node) {
                    Some(inner) => self.resolve_type(inner, env, depth + 1),
                    None => Ty::Any,
                }
            }
            "predefined_type" => match text {
                "any" => Ty::Any,
                "unknown" => Ty::Unknown,
                "never" => Ty::Never,
                "void" => Ty::Void,
                "number" => Ty::Number,
                "string" => Ty::String,
                "boolean" => Ty::Boolean,
                "bigint" => Ty::BigInt,
                "symbol" => Ty::Symbol,
                "undefined" => Ty::Undefined,
                "null" => Ty::Null,
                _ => Ty::Opaque,
            },
            "literal_type" => match first_expr_child(node) {
                Some(inner) => literal_ty(self.source, inner),
                None => Ty::Any,
            },
            "null" | "undefined" | "true" | "false" | "number" | "string" => {
                literal_ty(self.source, node)
            }
            "union_type" => {
                let mut cursor = node.walk();
                let members: Vec<Node<'t>> = node
                    .named_children(&mut cursor)
                    .filter(|c| c.kind() != "comment")
                    .collect();
                Ty::union(members.into_iter().map(|m| self.resolve_type(m, env, depth + 1)))
            }
            "intersection_type" => {
                let mut cursor = node.walk();
                let members: Vec<Node<'t>> = node
                    .named_children(&mut cursor)
                    .filter(|c| c.kind() != "comment")
                    .collect();
                let mut merged = ObjectTy::default();
                for member in members {
                    match self.resolve_type(member, env, depth + 1) {
                        Ty::Object(obj) => merge_object(&mut merged, obj),
                        Ty::Any => return Ty::Any,
                        _ => return Ty::Opaque,
                    }
                }
                Ty::Object(merged)
            }
            "array_type" => {
                let elem = first_expr_child(node)
                    .map_or(Ty::Any, |inner| self.resolve_type(inner, env, depth + 1));
                Ty::Array(Box::new(elem))
            }
            "tuple_type" => Ty::Array(Box::new(Ty::Any)),
            "function_type" | "constructor_type" => {
                let ret = node
                    .child_by_field_name("return_type")
                    .map_or(Ty::Any, |ret| self.resolve_type(ret, env, depth + 1));
                Ty::Function(Box::new(ret))
            }
            "object_type" | "interface_body" => Ty::Object(self.object_members(node, env, depth)),
            "type_identifier" => self.named_type(node, text, &[], env, depth),
            "generic_type" => {
                let Some(name) = node.child_by_field_name("name").or_else(|| first_expr_child(node))
                else {
                    return Ty::Any;
                };
                let args: Vec<Ty> = node
                    .child_by_field_name("type_arguments")
                    .map(|list| {
                        let mut cursor = list.walk();
                        let nodes: Vec<Node<'t>> = list
                            .named_children(&mut cursor)
                            .filter(|c| c.kind() != "comment")
                            .collect();
                        nodes
                            .into_iter()
                            .map(|arg| self.resolve_type(arg, env, depth + 1))
                            .collect()
                    })
                    .unwrap_or_default();
                let name_text = slice(self.source, name);
                if name_text == "Array" || name_text == "ReadonlyArray" {
                    let elem = args.into_iter().next().unwrap_or(Ty::Any);
                    return Ty::Array(Box::new(elem));
                }
                self.named_type(name, name_text, &args, env, depth)
            }
            "type_query" => match first_expr_child(node) {
                Some(expr) => self.expr_ty(expr, depth + 1),
                None => Ty::Any,
            },
            _ => Ty::Any,
        }
    }

    fn named_type(&self, at: Node<'t>, name: &str, args: &[Ty], env: &TypeEnv, depth: usize) -> Ty {
        if let Some(bound) = env.get(name) {
            return bound.clone();
        }
        match name {
            "Object" | "Function" | "Promise" | "Map" | "Set" | "Date" | "RegExp" | "Error" => {
                return Ty::Opaque;
            }
            "NonNullable" => {
                return args.first().map_or(Ty::Any, Ty::strip_nullish);
            }
            _ => {}
        }
        let Some(decl) = self.lookup_type(name, at.start_byte()) else {
            return Ty::Opaque;
        };
        let mut inner_env = TypeEnv::new();
        if let Some(params) = decl.child_by_field_name("type_parameters") {
            let mut cursor = params.walk();
            let names: Vec<&str> = params
                .named_children(&mut cursor)
                .filter_map(|param| param.child_by_field_name("name").or_else(|| first_expr_child(param)))
                .map(|name| slice(self.source, name))
                .collect();
            for (i, param) in names.into_iter().enumerate() {
                inner_env.insert(param.to_string(), args.get(i).cloned().unwrap_or(Ty::Any));
            }
        }
        match decl.kind() {
            "type_alias_declaration" => decl
                .child_by_field_name("value")
                .map_or(Ty::Any, |value| self.resolve_type(value, &inner_env, depth + 1)),
            "interface_declaration" => {
                let mut obj = decl
                    .child_by_field_name("body")
                    .map(|body| self.object_members(body, &inner_env, depth + 1))
                    .unwrap_or_default();
                self.merge_extends(decl, &mut obj, &inner_env, depth + 1);
                Ty::Object(obj)
            }
            "class_declaration" | "abstract_class_declaration" => {
                Ty::Object(self.class_members(decl, depth + 1))
            }
            _ => Ty::Opaque,
        }
    }

    fn merge_extends(&self, decl: Node<'t>, obj: &mut ObjectTy, env: &TypeEnv, depth: usize) {
        let mut cursor = decl.walk();
        let clauses: Vec<Node<'t>> = decl
            .named_children(&mut cursor)
            .filter(|c| c.kind() == "extends_type_clause")
            .collect();
        for clause in clauses {
            let mut cursor = clause.walk();
            let bases: Vec<Node<'t>> = clause.named_children(&mut cursor).collect();
            for base in bases {
                if let Ty::Object(parent) = self.resolve_type(base, env, depth + 1) {
                    merge_object(obj, parent);
                }
            }
        }
    }

    fn object_members(&self, body: Node<'t>, env: &TypeEnv, depth: usize) -> ObjectTy {
        let mut obj = ObjectTy::default();
        let mut cursor = body.walk();
        let members: Vec<Node<'t>> = body.named_children(&mut cursor).collect();
        for member in members {
            match member.kind() {
                "property_signature" => {
                    let Some(name) = member.child_by_field_name("name") else {
                        continue;
                    };
                    let ty = member
                        .child_by_field_name("type")
                        .map_or(Ty::Any, |ty| self.annotation_ty(ty, env, depth + 1));
                    obj.props.push(Prop {
                        name: property_name(self.source, name),
                        ty,
                        optional: has_question_token(member),
                    });
                }
                "method_signature" => {
                    let Some(name) = member.child_by_field_name("name") else {
                        continue;
                    };
                    let ret = member
                        .child_by_field_name("return_type")
                        .map_or(Ty::Any, |ty| self.annotation_ty(ty, env, depth + 1));
                    obj.props.push(Prop {
                        name: property_name(self.source, name),
                        ty: Ty::Function(Box::new(ret)),
                        optional: has_question_token(member),
                    });
                }
                "index_signature" => {
                    let ty = member
                        .child_by_field_name("type")
                        .map_or(Ty::Any, |ty| self.annotation_ty(ty, env, depth + 1));
                    obj.index = Some(Box::new(ty));
                }
                "call_signature" => {
                    let ret = member
                        .child_by_field_name("return_type")
                        .map_or(Ty::Any, |ty| self.annotation_ty(ty, env, depth + 1));
                    obj.call = Some(Box::new(ret));
                }
                _ => {}
            }
        }
        obj
    }

    fn class_members(&self, class: Node<'t>, depth: usize) -> ObjectTy {
        let env = TypeEnv::new();
        let mut obj = ObjectTy::default();
        let Some(body) = class.child_by_field_name("body") else {
            return obj;
        };
        let mut cursor = body.walk();
        let members: Vec<Node<'t>> = body.named_children(&mut cursor).collect();
        for member in members {
            let Some(name) = member
                .child_by_field_name("name")
                .or_else(|| member.child_by_field_name("property"))
            else {
                continue;
            };
            match member.kind() {
                "public_field_definition" | "field_definition" => {
                    let ty = match (member.child_by_field_name("type"), member.child_by_field_name("value")) {
                        (Some(ty), _) => self.annotation_ty(ty, &env, depth + 1),
                        (None, Some(value)) => self.expr_ty(value, depth + 1).widen(),
                        (None, None) => Ty::Any,
                    };
                    obj.props.push(Prop {
                        name: property_name(self.source, name),
                        ty,
                        optional: has_question_token(member),
                    });
                }
                "method_definition" | "method_signature" => {
                    let ret = member
                        .child_by_field_name("return_type")
                        .map_or(Ty::Any, |ty| self.annotation_ty(ty, &env, depth + 1));
                    obj.props.push(Prop {
                        name: property_name(self.source, name),
                        ty: Ty::Function(Box::new(ret)),
                        optional: false,
                    });
                }
                _ => {}
            }
        }
        obj
    }

    /// Types an expression node.
    fn expr_ty(&self, node: Node<'t>, depth: usize) -> Ty {
        if depth > MAX_RESOLVE_DEPTH {
            return Ty::Any;
        }
        let source = self.source;
        match node.kind() {
            "parenthesized_expression" => match first_expr_child(node) {
                Some(inner) => self.expr_ty(inner, depth + 1),
                None => Ty::Any,
            },
            "identifier" => {
                let name = slice(source, node);
                if name == "undefined" {
                    return Ty::Undefined;
                }
                match self.lookup_value(name, node.start_byte()) {
                    Some(decl) => self.decl_type(decl, depth + 1),
                    None => Ty::Any,
                }
            }
            "null" | "undefined" | "true" | "false" | "number" | "string" => {
                literal_ty(source, node)
            }
            "template_string" => Ty::String,
            "this" => match enclosing_class(node) {
                Some(class) => Ty::Object(self.class_members(class, depth + 1)),
                None => Ty::Any,
            },
            "member_expression" => {
                let Some(object) = access_object(node) else {
                    return Ty::Any;
                };
                let object_ty = self.expr_ty(object, depth + 1);
                let name = member_property(node)
                    .map(|p| slice(source, p).to_string())
                    .unwrap_or_default();
                let ty = property_ty(&object_ty.strip_nullish(), &name);
                optional_result(node, &object_ty, ty)
            }
            "subscript_expression" => {
                let Some(object) = access_object(node) else {
                    return Ty::Any;
                };
                let object_ty = self.expr_ty(object, depth + 1);
                let stripped = object_ty.strip_nullish();
                let ty = match subscript_index(node) {
                    Some(index) => match string_literal_value(source, index) {
                        Some(key) => property_ty(&stripped, key),
                        None => element_ty(&stripped),
                    },
                    None => Ty::Any,
                };
                optional_result(node, &object_ty, ty)
            }
            "call_expression" => {
                let Some(callee) = access_object(node) else {
                    return Ty::Any;
                };
                let callee_ty = self.expr_ty(callee, depth + 1);
                let ty = return_ty(&callee_ty.strip_nullish());
                optional_result(node, &callee_ty, ty)
            }
            "non_null_expression" => match assertion_inner(node) {
                Some(inner) => self.expr_ty(inner, depth + 1).strip_nullish(),
                None => Ty::Any,
            },
            "satisfies_expression" => match assertion_inner(node) {
                Some(inner) => self.expr_ty(inner, depth + 1),
                None => Ty::Any,
            },
            "as_expression" | "type_assertion" => {
                let asserted = if node.kind() == "as_expression" {
                    let mut cursor = node.walk();
                    let found = node.named_children(&mut cursor).nth(1);
                    found
                } else {
                    node.named_child(0).and_then(first_expr_child)
                };
                match asserted {
                    Some(ty) if slice(source, ty) == "const" => match assertion_inner(node) {
                        Some(inner) => self.expr_ty(inner, depth + 1),
                        None => Ty::Any,
                    },
                    Some(ty) => self.resolve_type(ty, &TypeEnv::new(), depth + 1),
                    None => match assertion_inner(node) {
                        Some(inner) => self.expr_ty(inner, depth + 1),
                        None => Ty::Any,
                    },
                }
            }
            "binary_expression" => match binary_parts(node) {
                Some((left, "??", right)) => Ty::union([
                    self.expr_ty(left, depth + 1).strip_nullish(),
                    self.expr_ty(right, depth + 1),
                ]),
                Some((_, op, _))
                    if matches!(
                        op,
                        "===" | "!==" | "==" | "!=" | "<" | ">" | "<=" | ">=" | "instanceof" | "in"
                    ) =>
                {
                    Ty::Boolean
                }
                _ => Ty::Any,
            },
            "unary_expression" => match unary_parts(node) {
                Some(("!", _)) | Some(("delete", _)) => Ty::Boolean,
                Some(("typeof", _)) => Ty::String,
                Some(("void", _)) => Ty::Undefined,
                Some(("-", _)) | Some(("+", _)) | Some(("~", _)) => Ty::Number,
                _ => Ty::Any,
            },
            "object" => {
                let mut obj = ObjectTy::default();
                let mut cursor = node.walk();
                let pairs: Vec<Node<'t>> = node
                    .named_children(&mut cursor)
                    .filter(|c| c.kind() == "pair")
                    .collect();
                for pair in pairs {
                    let (Some(key), Some(value)) =
                        (pair.child_by_field_name("key"), pair.child_by_field_name("value"))
                    else {
                        continue;
                    };
                    obj.props.push(Prop {
                        name: property_name(source, key),
                        ty: self.expr_ty(value, depth + 1).widen(),
                        optional: false,
                    });
                }
                Ty::Object(obj)
            }
            "array" => Ty::Array(Box::new(Ty::Any)),
            "arrow_function" | "function" | "function_expression" => {
                let ret = node
                    .child_by_field_name("return_type")
                    .map_or(Ty::Any, |ty| self.annotation_ty(ty, &TypeEnv::new(), depth + 1));
                Ty::Function(Box::new(ret))
            }
            "new_expression" => Ty::Opaque,
            _ => Ty::Any,
        }
    }
}

impl<'t> TypeQuery<'t> for DeclaredTypes<'t> {
    fn type_of(&self, expr: Node<'t>) -> Ty {
        self.expr_ty(expr, 0)
    }
}

fn innermost<T: Copy>(candidates: impl Iterator<Item = ((usize, usize), T)>, at: usize) -> Option<T> {
    candidates
        .filter(|((start, end), _)| *start <= at && at < *end)
        .min_by_key(|((start, end), _)| end - start)
        .map(|(_, value)| value)
}

fn enclosing_class<'t>(node: Node<'t>) -> Option<Node<'t>> {
    let mut current = node.parent();
    while let Some(parent) = current {
        match parent.kind() {
            "class_declaration" | "abstract_class_declaration" | "class" => return Some(parent),
            // `this` inside a non-arrow function is rebound.
            "function" | "function_expression" | "function_declaration" => return None,
            _ => current = parent.parent(),
        }
    }
    None
}

fn literal_ty(source: &str, node: Node<'_>) -> Ty {
    let text = slice(source, node);
    match node.kind() {
        "null" => Ty::Null,
        "undefined" => Ty::Undefined,
        "true" => Ty::BoolLit(true),
        "false" => Ty::BoolLit(false),
        "number" => {
            if let Some(digits) = text.strip_suffix('n') {
                return Ty::BigIntLit(digits.to_string());
            }
            parse_number(text).map_or(Ty::Number, Ty::NumLit)
        }
        "string" => Ty::StrLit(string_literal_value(source, node).unwrap_or("").to_string()),
        "unary_expression" => match unary_parts(node) {
            Some(("-", arg)) => match literal_ty(source, arg) {
                Ty::NumLit(v) => Ty::NumLit(-v),
                other => other,
            },
            _ => Ty::Number,
        },
        _ => Ty::Any,
    }
}

fn parse_number(text: &str) -> Option<f64> {
    let cleaned: String = text.chars().filter(|c| *c != '_').collect();
    if let Some(hex) = cleaned.strip_prefix("0x").or_else(|| cleaned.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16).ok().map(|v| v as f64);
    }
    if let Some(bin) = cleaned.strip_prefix("0b").or_else(|| cleaned.strip_prefix("0B")) {
        return u64::from_str_radix(bin, 2).ok().map(|v| v as f64);
    }
    if let Some(oct) = cleaned.strip_prefix("0o").or_else(|| cleaned.strip_prefix("0O")) {
        return u64::from_str_radix(oct, 8).ok().map(|v| v as f64);
    }
    cleaned.parse::<f64>().ok()
}

fn property_name(source: &str, name: Node<'_>) -> String {
    string_literal_value(source, name)
        .unwrap_or_else(|| slice(source, name))
        .to_string()
}

fn has_question_token(member: Node<'_>) -> bool {
    let mut cursor = member.walk();
    let found = member.children(&mut cursor).any(|c| c.kind() == "?");
    found
}

fn merge_object(into: &mut ObjectTy, from: ObjectTy) {
    for prop in from.props {
        if !into.props.iter().any(|p| p.name == prop.name) {
            into.props.push(prop);
        }
    }
    if into.index.is_none() {
        into.index = from.index;
    }
    if into.call.is_none() {
        into.call = from.call;
    }
}

fn property_ty(object: &Ty, name: &str) -> Ty {
    match object {
        Ty::Object(obj) => match obj.props.iter().find(|p| p.name == name) {
            Some(prop) if prop.optional => Ty::union([prop.ty.clone(), Ty::Undefined]),
            Some(prop) => prop.ty.clone(),
            None => obj.index.as_deref().cloned().unwrap_or(Ty::Any),
        },
        Ty::Union(members) => Ty::union(
            members
                .iter()
                .filter(|m| !m.is_nullish())
                .map(|m| property_ty(m, name)),
        ),
        Ty::Array(_) | Ty::String | Ty::StrLit(_) if name == "length" => Ty::Number,
        _ => Ty::Any,
    }
}

fn element_ty(object: &Ty) -> Ty {
    match object {
        Ty::Array(elem) => elem.as_ref().clone(),
        Ty::Object(obj) => obj.index.as_deref().cloned().unwrap_or(Ty::Any),
        Ty::Union(members) => Ty::union(members.iter().map(element_ty)),
        _ => Ty::Any,
    }
}

fn return_ty(callee: &Ty) -> Ty {
    match callee {
        Ty::Function(ret) => ret.as_ref().clone(),
        Ty::Object(obj) => obj.call.as_deref().cloned().unwrap_or(Ty::Any),
        Ty::Union(members) => Ty::union(members.iter().map(return_ty)),
        _ => Ty::Any,
    }
}

/// An access through `?.` (here or deeper in the chain) may yield `undefined`.
fn optional_result(node: Node<'_>, object_ty: &Ty, ty: Ty) -> Ty {
    if matches!(ty, Ty::Any | Ty::Unknown) {
        return ty;
    }
    let through_optional = has_optional_token(node)
        || access_object(node).is_some_and(|obj| !is_paren(obj) && contains_optional_chain(obj));
    if through_optional && (object_ty.includes_nullish() || !has_optional_token(node)) {
        Ty::union([ty, Ty::Undefined])
    } else {
        ty
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;

    fn type_of_last_expression(source: &str) -> TypeInfo {
        let tree = parse_source(source).unwrap();
        let root = tree.root_node();
        let oracle = DeclaredTypes::collect(root, source);
        let mut last = None;
        walk(root, &mut |n| {
            if n.kind() == "expression_statement" {
                last = n.named_child(0);
            }
        });
        oracle.type_info(last.expect("expression statement"))
    }

    #[test]
    fn test_declared_nullable_object() {
        let info = type_of_last_expression(
            "declare const foo: { bar: number } | null | undefined;\nfoo;\n",
        );
        assert!(info.has_null);
        assert!(info.has_undefined);
        assert!(!info.has_any);
        assert!(info.includes_explicit_nullish());
    }

    #[test]
    fn test_property_type_strips_object_nullishness() {
        let info = type_of_last_expression("declare const foo: { bar: number } | null;\nfoo.bar;\n");
        assert!(info.number_like);
        assert!(!info.includes_nullish());
    }

    #[test]
    fn test_optional_property_adds_undefined() {
        let info = type_of_last_expression("declare const foo: { bar?: string };\nfoo.bar;\n");
        assert!(info.has_undefined);
        assert!(info.string_like);
    }

    #[test]
    fn test_undeclared_identifier_is_any() {
        let info = type_of_last_expression("foo;\n");
        assert!(info.is_any_or_unknown());
        assert!(info.includes_nullish());
        assert!(!info.includes_explicit_nullish());
    }

    #[test]
    fn test_alias_and_interface_resolution() {
        let info = type_of_last_expression(
            "interface Bar { baz: boolean }\ntype Maybe<T> = T | null;\ndeclare const foo: Maybe<Bar>;\nfoo;\n",
        );
        assert!(info.has_null);
        let info = type_of_last_expression(
            "interface Bar { baz: boolean }\ndeclare const foo: Bar;\nfoo.baz;\n",
        );
        assert!(info.boolean_like);
        assert!(info.would_change_return_type());
    }

    #[test]
    fn test_falsy_literals() {
        let info = type_of_last_expression("declare const x: 0 | { a: 1 };\nx;\n");
        assert!(info.would_change_return_type());
        let info = type_of_last_expression("declare const x: 'a' | { a: 1 };\nx;\n");
        assert!(!info.would_change_return_type());
        let info = type_of_last_expression("declare const x: false | null;\nx;\n");
        assert!(!info.would_change_return_type());
    }

    #[test]
    fn test_optional_parameter_and_function_return() {
        let info = type_of_last_expression(
            "function f(a?: { b: number }) {}\ndeclare function g(): string | undefined;\ng();\n",
        );
        assert!(info.has_undefined);
        assert!(info.string_like);
    }

    #[test]
    fn test_non_null_assertion_strips_nullish() {
        let info = type_of_last_expression("declare const foo: { a: 1 } | null;\nfoo!;\n");
        assert!(!info.includes_nullish());
    }

    #[test]
    fn test_union_absorbs_any() {
        assert_eq!(Ty::union([Ty::Null, Ty::Any]), Ty::Any);
        assert_eq!(Ty::union([Ty::Null, Ty::Null]), Ty::Null);
        assert_eq!(
            Ty::union([Ty::Union(vec![Ty::Null, Ty::Number]), Ty::Undefined]),
            Ty::Union(vec![Ty::Null, Ty::Number, Ty::Undefined])
        );
    }
}
