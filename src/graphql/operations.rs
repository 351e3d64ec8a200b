//! Operation registry
//!
//! One parametrized GraphQL document per generic operation. Every document
//! takes the model name plus an operation-specific input; the server owns
//! input validation, so nothing here inspects the input shape.

use serde_json::{Map, Value as JsonValue};

use super::types::ModelName;

pub const FIND_MANY: &str = r#"
query FindMany($modelName: String!, $input: UnifiedFindManyInput) {
  findMany(modelName: $modelName, input: $input)
}
"#;

pub const FIND_UNIQUE: &str = r#"
query FindById($modelName: String!, $input: UnifiedFindByIdInput!) {
  findById(modelName: $modelName, input: $input)
}
"#;

pub const FIND_MANY_PAGINATED: &str = r#"
query FindManyPaginated($modelName: String!, $input: UnifiedPaginatedInput) {
  findManyPaginated(modelName: $modelName, input: $input) {
    data
    meta {
      currentPage
      totalPages
      totalItems
      hasNextPage
      hasPrevPage
    }
  }
}
"#;

pub const COUNT: &str = r#"
query Count($model: String!, $where: JSON) {
  count(model: $model, where: $where)
}
"#;

pub const AGGREGATE: &str = r#"
query Aggregate($model: String!, $options: JSON!) {
  aggregate(model: $model, options: $options)
}
"#;

pub const GROUP_BY: &str = r#"
query GroupBy($model: String!, $options: JSON!) {
  groupBy(model: $model, options: $options)
}
"#;

pub const CREATE_ONE: &str = r#"
mutation CreateOne($modelName: String!, $input: UnifiedCreateInput!) {
  createOne(modelName: $modelName, input: $input)
}
"#;

pub const UPDATE_ONE: &str = r#"
mutation UpdateOne($modelName: String!, $input: UnifiedUpdateInput!) {
  updateOne(modelName: $modelName, input: $input)
}
"#;

pub const DELETE_ONE: &str = r#"
mutation DeleteOne($modelName: String!, $input: UnifiedDeleteInput!) {
  deleteOne(modelName: $modelName, input: $input)
}
"#;

pub const CREATE_MANY: &str = r#"
mutation CreateMany($model: String!, $data: [JSON!]!, $skipDuplicates: Boolean) {
  createMany(model: $model, data: $data, skipDuplicates: $skipDuplicates)
}
"#;

pub const UPDATE_MANY: &str = r#"
mutation UpdateMany($model: String!, $where: JSON!, $data: JSON!) {
  updateMany(model: $model, where: $where, data: $data)
}
"#;

pub const DELETE_MANY: &str = r#"
mutation DeleteMany($model: String!, $where: JSON!) {
  deleteMany(model: $model, where: $where)
}
"#;

pub const UPSERT: &str = r#"
mutation Upsert($model: String!, $where: JSON!, $create: JSON!, $update: JSON!, $select: JSON, $include: JSON) {
  upsert(model: $model, where: $where, create: $create, update: $update, select: $select, include: $include)
}
"#;

pub const GET_AVAILABLE_MODELS: &str = r#"
query GetAvailableModels {
  getAvailableModels
}
"#;

pub const CLEAR_CACHE: &str = r#"
mutation ClearCache {
  clearCache
}
"#;

/// Whether an operation reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Query,
    Mutation,
}

/// How an operation's payload is wrapped in the variables object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputShape {
    /// `{ modelName, input: {...} }`
    Wrapped,
    /// `{ model, ...fields }`
    Flattened,
    /// No variables at all
    None,
}

/// A generic operation exposed by the unified GraphQL API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    FindMany,
    FindUnique,
    FindManyPaginated,
    Count,
    Aggregate,
    GroupBy,
    CreateOne,
    UpdateOne,
    DeleteOne,
    CreateMany,
    UpdateMany,
    DeleteMany,
    Upsert,
    GetAvailableModels,
    ClearCache,
}

impl Operation {
    pub const ALL: [Operation; 15] = [
        Operation::FindMany,
        Operation::FindUnique,
        Operation::FindManyPaginated,
        Operation::Count,
        Operation::Aggregate,
        Operation::GroupBy,
        Operation::CreateOne,
        Operation::UpdateOne,
        Operation::DeleteOne,
        Operation::CreateMany,
        Operation::UpdateMany,
        Operation::DeleteMany,
        Operation::Upsert,
        Operation::GetAvailableModels,
        Operation::ClearCache,
    ];

    pub fn document(&self) -> &'static str {
        match self {
            Operation::FindMany => FIND_MANY,
            Operation::FindUnique => FIND_UNIQUE,
            Operation::FindManyPaginated => FIND_MANY_PAGINATED,
            Operation::Count => COUNT,
            Operation::Aggregate => AGGREGATE,
            Operation::GroupBy => GROUP_BY,
            Operation::CreateOne => CREATE_ONE,
            Operation::UpdateOne => UPDATE_ONE,
            Operation::DeleteOne => DELETE_ONE,
            Operation::CreateMany => CREATE_MANY,
            Operation::UpdateMany => UPDATE_MANY,
            Operation::DeleteMany => DELETE_MANY,
            Operation::Upsert => UPSERT,
            Operation::GetAvailableModels => GET_AVAILABLE_MODELS,
            Operation::ClearCache => CLEAR_CACHE,
        }
    }

    /// GraphQL operation name as declared in the document.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::FindMany => "FindMany",
            Operation::FindUnique => "FindById",
            Operation::FindManyPaginated => "FindManyPaginated",
            Operation::Count => "Count",
            Operation::Aggregate => "Aggregate",
            Operation::GroupBy => "GroupBy",
            Operation::CreateOne => "CreateOne",
            Operation::UpdateOne => "UpdateOne",
            Operation::DeleteOne => "DeleteOne",
            Operation::CreateMany => "CreateMany",
            Operation::UpdateMany => "UpdateMany",
            Operation::DeleteMany => "DeleteMany",
            Operation::Upsert => "Upsert",
            Operation::GetAvailableModels => "GetAvailableModels",
            Operation::ClearCache => "ClearCache",
        }
    }

    /// Response field carrying the result.
    pub fn root_field(&self) -> &'static str {
        match self {
            Operation::FindMany => "findMany",
            Operation::FindUnique => "findById",
            Operation::FindManyPaginated => "findManyPaginated",
            Operation::Count => "count",
            Operation::Aggregate => "aggregate",
            Operation::GroupBy => "groupBy",
            Operation::CreateOne => "createOne",
            Operation::UpdateOne => "updateOne",
            Operation::DeleteOne => "deleteOne",
            Operation::CreateMany => "createMany",
            Operation::UpdateMany => "updateMany",
            Operation::DeleteMany => "deleteMany",
            Operation::Upsert => "upsert",
            Operation::GetAvailableModels => "getAvailableModels",
            Operation::ClearCache => "clearCache",
        }
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::FindMany
            | Operation::FindUnique
            | Operation::FindManyPaginated
            | Operation::Count
            | Operation::Aggregate
            | Operation::GroupBy
            | Operation::GetAvailableModels => OperationKind::Query,
            Operation::CreateOne
            | Operation::UpdateOne
            | Operation::DeleteOne
            | Operation::CreateMany
            | Operation::UpdateMany
            | Operation::DeleteMany
            | Operation::Upsert
            | Operation::ClearCache => OperationKind::Mutation,
        }
    }

    pub fn is_mutation(&self) -> bool {
        self.kind() == OperationKind::Mutation
    }

    /// Name of the variable carrying the model, if the operation takes one.
    pub fn model_arg(&self) -> Option<&'static str> {
        match self.shape() {
            InputShape::Wrapped => Some("modelName"),
            InputShape::Flattened => Some("model"),
            InputShape::None => None,
        }
    }

    fn shape(&self) -> InputShape {
        match self {
            Operation::FindMany
            | Operation::FindUnique
            | Operation::FindManyPaginated
            | Operation::CreateOne
            | Operation::UpdateOne
            | Operation::DeleteOne => InputShape::Wrapped,
            Operation::Count
            | Operation::Aggregate
            | Operation::GroupBy
            | Operation::CreateMany
            | Operation::UpdateMany
            | Operation::DeleteMany
            | Operation::Upsert => InputShape::Flattened,
            Operation::GetAvailableModels | Operation::ClearCache => InputShape::None,
        }
    }

    /// Build the variables object for this operation.
    ///
    /// Wrapped operations put `input` under an `input` key. Flattened
    /// operations merge the fields of an object `input` next to `model`;
    /// a non-object `input` is ignored for them. Null fields are dropped.
    pub fn variables(&self, model: &ModelName, input: JsonValue) -> JsonValue {
        let mut vars = Map::new();
        match self.shape() {
            InputShape::Wrapped => {
                vars.insert("modelName".into(), JsonValue::String(model.to_string()));
                if !input.is_null() {
                    vars.insert("input".into(), input);
                }
            }
            InputShape::Flattened => {
                vars.insert("model".into(), JsonValue::String(model.to_string()));
                if let JsonValue::Object(fields) = input {
                    vars.extend(fields.into_iter().filter(|(_, v)| !v.is_null()));
                }
            }
            InputShape::None => {}
        }
        JsonValue::Object(vars)
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.root_field())
    }
}
