//! Related-table fetching through relationship classes.
//!
//! `queryRelatedRecords` is addressed by the origin feature's object ID, so
//! the crossing has to be resolved before any related request can start.

use std::collections::BTreeMap;

use futures::future::try_join_all;
use serde_json::Value;

use crate::arcgis::{Attributes, Feature, FeatureServiceClient, FeatureServiceError};
use crate::domain::CrossingLocationId;

/// One relationship to follow and the fields to return from it.
#[derive(Debug, Clone, Copy)]
pub struct RelationshipQuery<'a> {
    pub relationship_id: i64,
    pub out_fields: &'a [&'a str],
}

/// Records returned for one relationship, grouped by origin object ID.
#[derive(Debug, Clone, Default)]
pub struct RelationshipRecords {
    pub relationship_id: i64,
    pub groups: BTreeMap<i64, Vec<Attributes>>,
}

impl RelationshipRecords {
    /// Records related to one origin feature. A missing group means none.
    pub fn records_for(&self, object_id: i64) -> &[Attributes] {
        self.groups.get(&object_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Take the records related to one origin feature.
    pub fn take(&mut self, object_id: i64) -> Vec<Attributes> {
        self.groups.remove(&object_id).unwrap_or_default()
    }
}

/// The crossing feature and everything reached through its relationships.
#[derive(Debug, Clone)]
pub struct ResolvedRelationships {
    pub feature: Feature,
    pub object_id: i64,
    /// One entry per query, in query order.
    pub records: Vec<RelationshipRecords>,
}

/// Resolve a crossing in `layer_id` and follow each relationship from it.
///
/// Relationship queries run concurrently once the object ID is known.
pub async fn fetch_by_relationship(
    client: &FeatureServiceClient,
    crossing_id: CrossingLocationId,
    layer_id: i64,
    queries: &[RelationshipQuery<'_>],
) -> Result<ResolvedRelationships, FeatureServiceError> {
    let feature = client
        .get_feature(&layer_id.to_string(), crossing_id.get())
        .await?
        .feature;
    let object_id = object_id(&feature.attributes).unwrap_or(crossing_id.get());

    let records = try_join_all(queries.iter().map(|q| async move {
        let response = client
            .query_related_records(layer_id, object_id, q.relationship_id, q.out_fields)
            .await?;

        let mut groups: BTreeMap<i64, Vec<Attributes>> = BTreeMap::new();
        for group in response.related_record_groups {
            groups
                .entry(group.object_id)
                .or_default()
                .extend(group.related_records.into_iter().map(|f| f.attributes));
        }

        Ok::<_, FeatureServiceError>(RelationshipRecords {
            relationship_id: q.relationship_id,
            groups,
        })
    }))
    .await?;

    Ok(ResolvedRelationships {
        feature,
        object_id,
        records,
    })
}

/// The `OBJECTID` attribute, matched case-insensitively.
fn object_id(attributes: &Attributes) -> Option<i64> {
    attributes
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("OBJECTID"))
        .and_then(|(_, value)| match value {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::test_support::FixtureServer;

    #[test]
    fn object_id_lookup() {
        let attrs = |v: Value| v.as_object().unwrap().clone();
        assert_eq!(object_id(&attrs(json!({"OBJECTID": 17}))), Some(17));
        assert_eq!(object_id(&attrs(json!({"ObjectId": "18"}))), Some(18));
        assert_eq!(object_id(&attrs(json!({"CrossingLocationId": 5}))), None);
    }

    #[test]
    fn missing_group_is_empty() {
        let mut records = RelationshipRecords::default();
        records.groups.insert(1, vec![Attributes::new()]);
        assert_eq!(records.records_for(1).len(), 1);
        assert!(records.records_for(2).is_empty());
        assert!(records.take(2).is_empty());
        assert_eq!(records.take(1).len(), 1);
    }

    #[tokio::test]
    async fn resolves_object_id_then_follows_relationships() {
        let server = FixtureServer::builder()
            .json(
                "0/5672",
                r#"{"feature": {"attributes": {"OBJECTID": 17, "CrossingLocationId": 5672}}}"#,
            )
            .json(
                "0/queryRelatedRecords?relationshipId=0",
                r#"{"relatedRecordGroups": [
                    {"objectId": 17, "relatedRecords": [{"attributes": {"LaneNumber": 1}}]},
                    {"objectId": 99, "relatedRecords": [{"attributes": {"LaneNumber": 4}}]}
                ]}"#,
            )
            .json(
                "0/queryRelatedRecords?relationshipId=2",
                r#"{"relatedRecordGroups": []}"#,
            )
            .start()
            .await;

        let queries = [
            RelationshipQuery {
                relationship_id: 0,
                out_fields: &["LaneNumber"],
            },
            RelationshipQuery {
                relationship_id: 2,
                out_fields: &[],
            },
        ];
        let resolved =
            fetch_by_relationship(&server.client(), CrossingLocationId::new(5672), 0, &queries)
                .await
                .unwrap();

        assert_eq!(resolved.object_id, 17);
        assert_eq!(resolved.records.len(), 2);
        assert_eq!(resolved.records[0].relationship_id, 0);
        assert_eq!(resolved.records[0].records_for(17)[0]["LaneNumber"], 1);
        assert!(resolved.records[1].records_for(17).is_empty());

        let related: Vec<_> = server
            .requests()
            .into_iter()
            .filter(|u| u.path().ends_with("queryRelatedRecords"))
            .collect();
        assert_eq!(related.len(), 2);
        for url in related {
            assert!(url.query_pairs().any(|(k, v)| k == "objectIds" && v == "17"));
        }
    }

    #[tokio::test]
    async fn falls_back_to_crossing_id() {
        let server = FixtureServer::builder()
            .json("0/42", r#"{"feature": {"attributes": {"CrossingLocationId": 42}}}"#)
            .json(
                "0/queryRelatedRecords?relationshipId=1",
                r#"{"relatedRecordGroups": []}"#,
            )
            .start()
            .await;

        let queries = [RelationshipQuery {
            relationship_id: 1,
            out_fields: &[],
        }];
        let resolved =
            fetch_by_relationship(&server.client(), CrossingLocationId::new(42), 0, &queries)
                .await
                .unwrap();
        assert_eq!(resolved.object_id, 42);
    }
}
