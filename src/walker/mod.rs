//! Document walker: discovers every regex pattern in an API document.
//!
//! The walk is lazy and restartable: [`Walker::iter`] returns a fresh
//! iterator each time, driven by an explicit work stack rather than
//! recursion. It covers:
//! - named component schemas (`components/schemas`, Swagger `definitions`)
//! - path-level and operation parameters (schema, Swagger inline `pattern`,
//!   array `items`, media-type `content`)
//! - request-body and response media-type schemas, response header schemas
//!
//! Within a schema it follows `properties`, `items`, `allOf`/`anyOf`/`oneOf`
//! branches, `not` and a schema-valued `additionalProperties`.
//!
//! Local `$ref`s are followed in place, so locations stay at the referencing
//! site. A reference already on the current descent path is a cycle and is
//! not entered again; descent also stops at `max_depth`. Shared references
//! in an acyclic graph can still multiply the work, so one walk resolves at
//! most `max_ref_expansions` references in total. All three limits produce
//! a [`Diagnostic`] instead of failing the walk.

mod lines;

pub use lines::{line_number, LineIndex};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use tracing::warn;

use crate::detect::LocatedPattern;
use crate::document::{escape_segment, Document};

/// Default bound on schema nesting.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Default bound on `$ref` resolutions in one walk.
pub const DEFAULT_MAX_REF_EXPANSIONS: usize = 10_000;

/// HTTP methods that carry operations in a path item, in OpenAPI order.
pub const HTTP_METHODS: &[&str] = &[
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

const COMPOSITIONS: &[&str] = &["allOf", "anyOf", "oneOf"];

/// An operation found under a path item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationInfo {
    pub location: String,
    pub path: String,
    pub method: String,
    pub operation_id: Option<String>,
    pub summary: Option<String>,
}

/// A named component schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaInfo {
    pub location: String,
    pub name: String,
    pub description: Option<String>,
    pub has_example: bool,
}

/// A path template under `paths`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathInfo {
    pub location: String,
    pub template: String,
}

/// A node the walker skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub location: String,
    pub reason: String,
}

/// One item produced by the walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkItem {
    Pattern(LocatedPattern),
    Operation(OperationInfo),
    Schema(SchemaInfo),
    Path(PathInfo),
    Skipped(Diagnostic),
}

/// Walks one document.
pub struct Walker<'a> {
    doc: &'a Document,
    max_depth: usize,
    max_ref_expansions: usize,
}

impl<'a> Walker<'a> {
    pub fn new(doc: &'a Document) -> Self {
        Self {
            doc,
            max_depth: DEFAULT_MAX_DEPTH,
            max_ref_expansions: DEFAULT_MAX_REF_EXPANSIONS,
        }
    }

    /// Set the maximum schema nesting depth.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Set the total number of `$ref` resolutions allowed in one walk.
    pub fn max_ref_expansions(mut self, limit: usize) -> Self {
        self.max_ref_expansions = limit;
        self
    }

    /// Start a new walk over the whole document.
    pub fn iter(&self) -> Walk<'a> {
        let root = &self.doc.root;
        let mut stack = Vec::new();

        if let Some(paths) = root.get("paths") {
            stack.push(Task::Paths(paths));
        }
        if let Some(defs) = root.get("definitions") {
            stack.push(Task::Definitions {
                node: defs,
                location: "#/definitions".to_string(),
            });
        }
        if let Some(schemas) = root.get("components").and_then(|c| c.get("schemas")) {
            stack.push(Task::Definitions {
                node: schemas,
                location: "#/components/schemas".to_string(),
            });
        }

        Walk {
            doc: self.doc,
            max_depth: self.max_depth,
            max_ref_expansions: self.max_ref_expansions,
            ref_expansions: 0,
            stack,
            pending: VecDeque::new(),
        }
    }

    /// Only the located patterns, in walk order.
    pub fn patterns(&self) -> impl Iterator<Item = LocatedPattern> + 'a {
        self.iter().filter_map(|item| match item {
            WalkItem::Pattern(p) => Some(p),
            _ => None,
        })
    }
}

/// References followed on the way to the current node.
type RefChain = Vec<String>;

enum Task<'a> {
    Definitions {
        node: &'a Value,
        location: String,
    },
    Paths(&'a Value),
    PathItem {
        template: String,
        node: &'a Value,
        location: String,
    },
    Operation {
        template: String,
        method: &'static str,
        node: &'a Value,
        location: String,
    },
    Parameter {
        node: &'a Value,
        location: String,
    },
    RequestBody {
        node: &'a Value,
        location: String,
    },
    Response {
        node: &'a Value,
        location: String,
    },
    Schema {
        node: &'a Value,
        location: String,
        depth: usize,
        refs: RefChain,
    },
}

/// A single walk in progress.
pub struct Walk<'a> {
    doc: &'a Document,
    max_depth: usize,
    max_ref_expansions: usize,
    /// References resolved so far in this walk
    ref_expansions: usize,
    stack: Vec<Task<'a>>,
    pending: VecDeque<WalkItem>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = WalkItem;

    fn next(&mut self) -> Option<WalkItem> {
        loop {
            if let Some(item) = self.pending.pop_front() {
                return Some(item);
            }
            let task = self.stack.pop()?;
            self.expand(task);
        }
    }
}

impl<'a> Walk<'a> {
    fn emit(&mut self, item: WalkItem) {
        self.pending.push_back(item);
    }

    fn skip(&mut self, location: &str, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(location, %reason, "skipping document node");
        self.emit(WalkItem::Skipped(Diagnostic {
            location: location.to_string(),
            reason,
        }));
    }

    /// Push children so they are expanded in the order given.
    fn push_all(&mut self, mut children: Vec<Task<'a>>) {
        children.reverse();
        self.stack.extend(children);
    }

    /// Follow local `$ref`s until a concrete node is reached.
    fn deref(
        &mut self,
        mut node: &'a Value,
        location: &str,
        mut refs: RefChain,
    ) -> Option<(&'a Value, RefChain)> {
        while let Some(target) = node.get("$ref").and_then(Value::as_str) {
            if refs.iter().any(|r| r == target) {
                self.skip(location, format!("reference cycle through {}", target));
                return None;
            }
            if refs.len() >= self.max_depth {
                self.skip(location, format!("reference chain longer than {}", self.max_depth));
                return None;
            }
            if self.ref_expansions >= self.max_ref_expansions {
                self.skip(
                    location,
                    format!(
                        "reference budget of {} resolutions exhausted at {}",
                        self.max_ref_expansions, target
                    ),
                );
                return None;
            }
            if !target.starts_with('#') {
                self.skip(location, format!("external reference {} not resolved", target));
                return None;
            }
            match self.doc.resolve_ref(target) {
                Some(resolved) => {
                    self.ref_expansions += 1;
                    refs.push(target.to_string());
                    node = resolved;
                }
                None => {
                    self.skip(location, format!("unresolvable reference {}", target));
                    return None;
                }
            }
        }
        Some((node, refs))
    }

    fn expand(&mut self, task: Task<'a>) {
        match task {
            Task::Definitions { node, location } => self.expand_definitions(node, location),
            Task::Paths(node) => self.expand_paths(node),
            Task::PathItem {
                template,
                node,
                location,
            } => self.expand_path_item(template, node, location),
            Task::Operation {
                template,
                method,
                node,
                location,
            } => self.expand_operation(template, method, node, location),
            Task::Parameter { node, location } => self.expand_parameter(node, location),
            Task::RequestBody { node, location } => self.expand_request_body(node, location),
            Task::Response { node, location } => self.expand_response(node, location),
            Task::Schema {
                node,
                location,
                depth,
                refs,
            } => self.expand_schema(node, location, depth, refs),
        }
    }

    fn expand_definitions(&mut self, node: &'a Value, location: String) {
        let Some(schemas) = node.as_object() else {
            self.skip(&location, "expected a map of schemas");
            return;
        };

        let mut children = Vec::new();
        for (name, schema) in schemas {
            let schema_location = format!("{}/{}", location, escape_segment(name));
            if let Some(obj) = schema.as_object() {
                self.emit(WalkItem::Schema(SchemaInfo {
                    location: schema_location.clone(),
                    name: name.clone(),
                    description: non_blank(obj.get("description")),
                    has_example: has_example(schema),
                }));
            }
            children.push(Task::Schema {
                node: schema,
                location: schema_location,
                depth: 0,
                refs: Vec::new(),
            });
        }
        self.push_all(children);
    }

    fn expand_paths(&mut self, node: &'a Value) {
        let Some(paths) = node.as_object() else {
            self.skip("#/paths", "expected a map of path items");
            return;
        };

        let mut children = Vec::new();
        for (template, item) in paths {
            // `x-` extensions live alongside path templates.
            if template.starts_with("x-") {
                continue;
            }
            let location = format!("#/paths/{}", escape_segment(template));
            self.emit(WalkItem::Path(PathInfo {
                location: location.clone(),
                template: template.clone(),
            }));
            children.push(Task::PathItem {
                template: template.clone(),
                node: item,
                location,
            });
        }
        self.push_all(children);
    }

    fn expand_path_item(&mut self, template: String, node: &'a Value, location: String) {
        let Some((node, _)) = self.deref(node, &location, Vec::new()) else {
            return;
        };
        let Some(item) = node.as_object() else {
            self.skip(&location, "expected a path item object");
            return;
        };

        let mut children = Vec::new();
        if let Some(params) = item.get("parameters") {
            children.extend(self.parameter_tasks(params, &location));
        }
        for (key, op) in item {
            let Some(method) = HTTP_METHODS
                .iter()
                .copied()
                .find(|m| key.eq_ignore_ascii_case(m))
            else {
                continue;
            };
            children.push(Task::Operation {
                template: template.clone(),
                method,
                node: op,
                location: format!("{}/{}", location, method),
            });
        }
        self.push_all(children);
    }

    fn parameter_tasks(&mut self, params: &'a Value, location: &str) -> Vec<Task<'a>> {
        let Some(list) = params.as_array() else {
            self.skip(&format!("{}/parameters", location), "expected a list of parameters");
            return Vec::new();
        };
        list.iter()
            .enumerate()
            .map(|(i, p)| Task::Parameter {
                node: p,
                location: format!("{}/parameters/{}", location, i),
            })
            .collect()
    }

    fn expand_operation(
        &mut self,
        template: String,
        method: &'static str,
        node: &'a Value,
        location: String,
    ) {
        let Some(op) = node.as_object() else {
            self.skip(&location, "expected an operation object");
            return;
        };

        self.emit(WalkItem::Operation(OperationInfo {
            location: location.clone(),
            path: template,
            method: method.to_string(),
            operation_id: non_blank(op.get("operationId")),
            summary: non_blank(op.get("summary")),
        }));

        let mut children = Vec::new();
        if let Some(params) = op.get("parameters") {
            children.extend(self.parameter_tasks(params, &location));
        }
        if let Some(body) = op.get("requestBody") {
            children.push(Task::RequestBody {
                node: body,
                location: format!("{}/requestBody", location),
            });
        }
        if let Some(responses) = op.get("responses") {
            match responses.as_object() {
                Some(map) => {
                    for (code, response) in map {
                        children.push(Task::Response {
                            node: response,
                            location: format!(
                                "{}/responses/{}",
                                location,
                                escape_segment(code)
                            ),
                        });
                    }
                }
                None => self.skip(
                    &format!("{}/responses", location),
                    "expected a map of responses",
                ),
            }
        }
        self.push_all(children);
    }

    fn expand_parameter(&mut self, node: &'a Value, location: String) {
        let Some((node, refs)) = self.deref(node, &location, Vec::new()) else {
            return;
        };
        let Some(param) = node.as_object() else {
            self.skip(&location, "expected a parameter object");
            return;
        };

        // Swagger 2 puts constraints on the parameter itself.
        self.take_pattern(param.get("pattern"), &location);

        let mut children = Vec::new();
        if let Some(schema) = param.get("schema") {
            children.push(self.schema_task(schema, format!("{}/schema", location), 0, &refs));
        }
        if let Some(items) = param.get("items") {
            children.push(self.schema_task(items, format!("{}/items", location), 0, &refs));
        }
        if let Some(content) = param.get("content") {
            children.extend(self.content_tasks(content, &location, &refs));
        }
        self.push_all(children);
    }

    fn expand_request_body(&mut self, node: &'a Value, location: String) {
        let Some((node, refs)) = self.deref(node, &location, Vec::new()) else {
            return;
        };
        if !node.is_object() {
            self.skip(&location, "expected a request body object");
            return;
        }
        let children = match node.get("content") {
            Some(content) => self.content_tasks(content, &location, &refs),
            None => Vec::new(),
        };
        self.push_all(children);
    }

    fn expand_response(&mut self, node: &'a Value, location: String) {
        let Some((node, refs)) = self.deref(node, &location, Vec::new()) else {
            return;
        };
        let Some(response) = node.as_object() else {
            self.skip(&location, "expected a response object");
            return;
        };

        let mut children = Vec::new();
        if let Some(content) = response.get("content") {
            children.extend(self.content_tasks(content, &location, &refs));
        }
        // Swagger 2 response schema
        if let Some(schema) = response.get("schema") {
            children.push(self.schema_task(schema, format!("{}/schema", location), 0, &refs));
        }
        if let Some(headers) = response.get("headers").and_then(Value::as_object) {
            for (name, header) in headers {
                let header_location = format!("{}/headers/{}", location, escape_segment(name));
                let Some((header, header_refs)) =
                    self.deref(header, &header_location, refs.clone())
                else {
                    continue;
                };
                self.take_pattern(header.get("pattern"), &header_location);
                if let Some(schema) = header.get("schema") {
                    children.push(self.schema_task(
                        schema,
                        format!("{}/schema", header_location),
                        0,
                        &header_refs,
                    ));
                }
            }
        }
        self.push_all(children);
    }

    /// One schema task per media type under a `content` map.
    fn content_tasks(&mut self, content: &'a Value, location: &str, refs: &RefChain) -> Vec<Task<'a>> {
        let content_location = format!("{}/content", location);
        let Some(media_types) = content.as_object() else {
            self.skip(&content_location, "expected a map of media types");
            return Vec::new();
        };

        let mut tasks = Vec::new();
        for (media_type, media) in media_types {
            let media_location = format!("{}/{}", content_location, escape_segment(media_type));
            match media.as_object() {
                Some(obj) => {
                    if let Some(schema) = obj.get("schema") {
                        tasks.push(self.schema_task(
                            schema,
                            format!("{}/schema", media_location),
                            0,
                            refs,
                        ));
                    }
                }
                None => self.skip(&media_location, "expected a media type object"),
            }
        }
        tasks
    }

    fn schema_task(&self, node: &'a Value, location: String, depth: usize, refs: &RefChain) -> Task<'a> {
        Task::Schema {
            node,
            location,
            depth,
            refs: refs.clone(),
        }
    }

    /// Emit a pattern if the field is present; diagnose a non-string.
    fn take_pattern(&mut self, field: Option<&'a Value>, location: &str) {
        match field {
            Some(Value::String(p)) => self.emit(WalkItem::Pattern(LocatedPattern::new(location, p.clone()))),
            Some(_) => self.skip(location, "pattern is not a string"),
            None => {}
        }
    }

    fn expand_schema(&mut self, node: &'a Value, location: String, depth: usize, refs: RefChain) {
        if depth > self.max_depth {
            self.skip(&location, format!("schema nested deeper than {}", self.max_depth));
            return;
        }
        // Boolean schemas are legal and constrain nothing.
        if node.is_boolean() {
            return;
        }
        let Some((node, refs)) = self.deref(node, &location, refs) else {
            return;
        };
        let Some(schema) = node.as_object() else {
            self.skip(&location, format!("expected a schema object, found {}", type_name(node)));
            return;
        };

        self.take_pattern(schema.get("pattern"), &location);

        let next = depth + 1;
        let mut children = Vec::new();

        if let Some(props) = schema.get("properties") {
            match props.as_object() {
                Some(map) => {
                    for (name, prop) in map {
                        children.push(self.schema_task(
                            prop,
                            format!("{}/properties/{}", location, escape_segment(name)),
                            next,
                            &refs,
                        ));
                    }
                }
                None => self.skip(&format!("{}/properties", location), "expected a map of schemas"),
            }
        }

        match schema.get("items") {
            Some(Value::Array(list)) => {
                for (i, item) in list.iter().enumerate() {
                    children.push(self.schema_task(item, format!("{}/items/{}", location, i), next, &refs));
                }
            }
            Some(items) => {
                children.push(self.schema_task(items, format!("{}/items", location), next, &refs));
            }
            None => {}
        }

        for keyword in COMPOSITIONS {
            let Some(branches) = schema.get(*keyword) else {
                continue;
            };
            match branches.as_array() {
                Some(list) => {
                    for (i, branch) in list.iter().enumerate() {
                        children.push(self.schema_task(
                            branch,
                            format!("{}/{}/{}", location, keyword, i),
                            next,
                            &refs,
                        ));
                    }
                }
                None => self.skip(&format!("{}/{}", location, keyword), "expected a list of schemas"),
            }
        }

        if let Some(not) = schema.get("not") {
            children.push(self.schema_task(not, format!("{}/not", location), next, &refs));
        }

        if let Some(additional) = schema.get("additionalProperties") {
            if additional.is_object() {
                children.push(self.schema_task(
                    additional,
                    format!("{}/additionalProperties", location),
                    next,
                    &refs,
                ));
            }
        }

        self.push_all(children);
    }
}

fn non_blank(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn has_example(schema: &Value) -> bool {
    if schema.get("example").is_some() {
        return true;
    }
    match schema.get("examples") {
        Some(Value::Array(list)) => !list.is_empty(),
        Some(Value::Object(map)) => !map.is_empty(),
        Some(Value::Null) | None => false,
        Some(_) => true,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
