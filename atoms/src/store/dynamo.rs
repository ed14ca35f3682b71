use async_trait::async_trait;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoClient;
use serde_json::{Number, Value};
use std::collections::HashMap;

use super::{new_document_id, Document, DocumentStore, Fields, Query, StoreError, StoreResult};

/// Single-table DynamoDB backend.
///
/// Every document is one item: `PK` holds the collection name and `SK` the
/// document id, the remaining attributes are the document fields.
///
/// Collections listed in [`LOOKUP_FIELDS`] also carry `GSI1PK`
/// (`{collection}#{value}`) and `GSI1SK` (the id), so a query filtering on
/// that field reads only the matching items through [`LOOKUP_INDEX`].
#[derive(Debug, Clone)]
pub struct DynamoStore {
    client: DynamoClient,
    table_name: String,
}

impl DynamoStore {
    pub fn new(client: DynamoClient, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }
}

/// Global secondary index keyed on `GSI1PK` / `GSI1SK`.
pub const LOOKUP_INDEX: &str = "GSI1";

/// The one field per collection that is projected into the lookup index.
pub const LOOKUP_FIELDS: &[(&str, &str)] = &[
    ("tarefas", "user"),
    ("comments", "taskId"),
    ("connections", "user"),
];

const KEY_ATTRIBUTES: [&str; 4] = ["PK", "SK", "GSI1PK", "GSI1SK"];

fn is_key_attribute(name: &str) -> bool {
    KEY_ATTRIBUTES.contains(&name)
}

fn lookup_field(collection: &str) -> Option<&'static str> {
    LOOKUP_FIELDS
        .iter()
        .find(|(c, _)| *c == collection)
        .map(|(_, field)| *field)
}

fn lookup_key(collection: &str, value: &str) -> String {
    format!("{}#{}", collection, value)
}

/// Index partition for `query`, plus the position of the filter it covers.
fn lookup_partition(query: &Query) -> Option<(usize, String)> {
    let field = lookup_field(&query.collection)?;
    query.filters.iter().enumerate().find_map(|(i, filter)| {
        match (&filter.value, filter.field == field) {
            (Value::String(value), true) => Some((i, lookup_key(&query.collection, value))),
            _ => None,
        }
    })
}

pub(crate) fn to_attribute(value: &Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s.clone()),
        Value::Array(items) => AttributeValue::L(items.iter().map(to_attribute).collect()),
        Value::Object(map) => AttributeValue::M(
            map.iter()
                .map(|(k, v)| (k.clone(), to_attribute(v)))
                .collect(),
        ),
    }
}

pub(crate) fn from_attribute(attr: &AttributeValue) -> Value {
    match attr {
        AttributeValue::S(s) => Value::String(s.clone()),
        AttributeValue::N(n) => n
            .parse::<i64>()
            .map(Value::from)
            .ok()
            .or_else(|| {
                n.parse::<f64>()
                    .ok()
                    .and_then(Number::from_f64)
                    .map(Value::Number)
            })
            .unwrap_or(Value::Null),
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::L(items) => Value::Array(items.iter().map(from_attribute).collect()),
        AttributeValue::M(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), from_attribute(v)))
                .collect(),
        ),
        AttributeValue::Ss(items) => Value::Array(items.iter().cloned().map(Value::String).collect()),
        _ => Value::Null,
    }
}

fn item_from_fields(collection: &str, id: &str, fields: &Fields) -> HashMap<String, AttributeValue> {
    let mut item: HashMap<String, AttributeValue> = fields
        .iter()
        .filter(|(k, _)| !is_key_attribute(k))
        .map(|(k, v)| (k.clone(), to_attribute(v)))
        .collect();
    item.insert("PK".to_string(), AttributeValue::S(collection.to_string()));
    item.insert("SK".to_string(), AttributeValue::S(id.to_string()));

    let lookup = lookup_field(collection).and_then(|field| fields.get(field)?.as_str());
    if let Some(value) = lookup {
        item.insert("GSI1PK".to_string(), AttributeValue::S(lookup_key(collection, value)));
        item.insert("GSI1SK".to_string(), AttributeValue::S(id.to_string()));
    }
    item
}

fn document_from_item(
    collection: &str,
    item: &HashMap<String, AttributeValue>,
) -> StoreResult<Document> {
    let id = item
        .get("SK")
        .and_then(|v| v.as_s().ok())
        .ok_or_else(|| StoreError::Malformed {
            collection: collection.to_string(),
            id: String::new(),
            reason: "missing SK".to_string(),
        })?;

    let fields = item
        .iter()
        .filter(|(k, _)| !is_key_attribute(k))
        .map(|(k, v)| (k.clone(), from_attribute(v)))
        .collect();

    Ok(Document::new(id.clone(), fields))
}

#[async_trait]
impl DocumentStore for DynamoStore {
    async fn add(&self, collection: &str, fields: Fields) -> StoreResult<Document> {
        let id = new_document_id();
        self.set(collection, &id, fields).await
    }

    async fn set(&self, collection: &str, id: &str, fields: Fields) -> StoreResult<Document> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item_from_fields(collection, id, &fields)))
            .send()
            .await
            .map_err(|e| StoreError::backend("put_item", DisplayErrorContext(e)))?;

        Ok(Document::new(id, fields))
    }

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(collection.to_string()))
            .key("SK", AttributeValue::S(id.to_string()))
            .send()
            .await
            .map_err(|e| StoreError::backend("get_item", DisplayErrorContext(e)))?;

        result
            .item()
            .map(|item| document_from_item(collection, item))
            .transpose()
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        self.client
            .delete_item()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(collection.to_string()))
            .key("SK", AttributeValue::S(id.to_string()))
            .send()
            .await
            .map_err(|e| StoreError::backend("delete_item", DisplayErrorContext(e)))?;

        Ok(())
    }

    async fn query(&self, query: &Query) -> StoreResult<Vec<Document>> {
        let lookup = lookup_partition(query);
        let mut docs = Vec::new();
        let mut exclusive_start_key = None;

        loop {
            let mut request = self.client.query().table_name(&self.table_name);
            request = match &lookup {
                Some((_, partition)) => request
                    .index_name(LOOKUP_INDEX)
                    .key_condition_expression("GSI1PK = :pk")
                    .expression_attribute_values(":pk", AttributeValue::S(partition.clone())),
                None => request
                    .key_condition_expression("PK = :pk")
                    .expression_attribute_values(":pk", AttributeValue::S(query.collection.clone())),
            };
            request = request.set_exclusive_start_key(exclusive_start_key.take());

            // Field names go through placeholders: `user` and `public` are reserved words
            let mut conditions = Vec::with_capacity(query.filters.len());
            for (i, filter) in query.filters.iter().enumerate() {
                if lookup.as_ref().is_some_and(|(covered, _)| *covered == i) {
                    continue;
                }
                let name = format!("#f{}", i);
                let value = format!(":f{}", i);
                conditions.push(format!("{} = {}", name, value));
                request = request
                    .expression_attribute_names(name, filter.field.clone())
                    .expression_attribute_values(value, to_attribute(&filter.value));
            }
            if !conditions.is_empty() {
                request = request.filter_expression(conditions.join(" AND "));
            }

            let output = request
                .send()
                .await
                .map_err(|e| StoreError::backend("query", DisplayErrorContext(e)))?;

            for item in output.items() {
                docs.push(document_from_item(&query.collection, item)?);
            }

            match output.last_evaluated_key() {
                Some(key) if !key.is_empty() => exclusive_start_key = Some(key.clone()),
                _ => break,
            }
        }

        query.sort(&mut docs);
        Ok(docs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_item_keys_and_attributes() {
        let fields = json!({
            "tarefa": "Buy milk",
            "user": "a@x.com",
            "public": true,
            "PK": "ignored"
        });
        let item = item_from_fields("tarefas", "t-1", fields.as_object().unwrap());

        assert_eq!(item.get("PK"), Some(&AttributeValue::S("tarefas".to_string())));
        assert_eq!(item.get("SK"), Some(&AttributeValue::S("t-1".to_string())));
        assert_eq!(item.get("public"), Some(&AttributeValue::Bool(true)));
        assert_eq!(
            item.get("GSI1PK"),
            Some(&AttributeValue::S("tarefas#a@x.com".to_string()))
        );
        assert_eq!(item.get("GSI1SK"), Some(&AttributeValue::S("t-1".to_string())));
        assert_eq!(item.len(), 7);
    }

    #[test]
    fn test_document_from_item_strips_keys() {
        let fields = json!({
            "comment": "nice",
            "count": 3,
            "ratio": 0.5,
            "tags": ["a", "b"],
            "meta": {"k": null}
        });
        let item = item_from_fields("comments", "c-1", fields.as_object().unwrap());

        let doc = document_from_item("comments", &item).unwrap();

        assert_eq!(doc.id, "c-1");
        assert_eq!(Value::Object(doc.fields), fields);
    }

    #[test]
    fn test_item_without_sort_key_is_malformed() {
        let mut item = HashMap::new();
        item.insert("PK".to_string(), AttributeValue::S("tarefas".to_string()));

        let err = document_from_item("tarefas", &item).unwrap_err();
        assert!(matches!(err, StoreError::Malformed { .. }));
    }

    #[test]
    fn test_lookup_keys_stay_out_of_documents() {
        let fields = json!({"taskId": "t-1", "comment": "ok"});
        let item = item_from_fields("comments", "c-1", fields.as_object().unwrap());
        assert_eq!(
            item.get("GSI1PK"),
            Some(&AttributeValue::S("comments#t-1".to_string()))
        );

        let doc = document_from_item("comments", &item).unwrap();
        assert_eq!(Value::Object(doc.fields), fields);
    }

    #[test]
    fn test_unindexed_collection_has_no_lookup_key() {
        let fields = json!({"user": "a@x.com"});
        let item = item_from_fields("drafts", "d-1", fields.as_object().unwrap());

        assert_eq!(item.get("GSI1PK"), None);
        assert_eq!(item.len(), 3);
    }

    #[test]
    fn test_owner_query_uses_lookup_partition() {
        let query = Query::collection("tarefas")
            .where_eq("public", true)
            .where_eq("user", "a@x.com");

        assert_eq!(
            lookup_partition(&query),
            Some((1, "tarefas#a@x.com".to_string()))
        );
    }

    #[test]
    fn test_queries_without_lookup_field_scan_the_collection() {
        assert_eq!(lookup_partition(&Query::collection("tarefas")), None);
        assert_eq!(
            lookup_partition(&Query::collection("tarefas").where_eq("public", true)),
            None
        );
        // non-string values were never written to the index
        assert_eq!(
            lookup_partition(&Query::collection("comments").where_eq("taskId", 7)),
            None
        );
    }
}
