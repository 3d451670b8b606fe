//! Fetching through the `BridgeVC` server extension.
//!
//! The extension joins and groups related data server-side, so a single
//! request yields the whole crossing. Its documents are OIDs like those from
//! the query endpoints and its dates are ISO strings; the decoder coerces
//! both.

use crate::arcgis::{
    ExtensionCrossingDto, FeatureServiceClient, FeatureServiceError, convert_extension_crossing,
};
use crate::domain::{Crossing, CrossingLocationId};

/// Fetch a pre-assembled crossing from `{root}/{extension_path}/{id}`.
pub async fn fetch_from_extension(
    client: &FeatureServiceClient,
    crossing_id: CrossingLocationId,
    extension_path: &str,
) -> Result<Crossing, FeatureServiceError> {
    let id = crossing_id.to_string();
    let dto: ExtensionCrossingDto = client.get_typed(&[extension_path, &id], &[]).await?;

    convert_extension_crossing(dto).map_err(|source| FeatureServiceError::Conversion {
        url: client
            .endpoint(&[extension_path, &id])
            .map(|u| u.to_string())
            .unwrap_or_else(|_| format!("{extension_path}/{id}")),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Direction, LaneClearances};
    use crate::test_support::FixtureServer;

    #[tokio::test]
    async fn decodes_extension_crossing() {
        let server = FixtureServer::builder()
            .json(
                "exts/BridgeVC/crossing/5672",
                r#"{
                    "CrossingLocation": {
                        "CrossingLocationId": 5672,
                        "StateRouteIdentifier": "405",
                        "SRMP": 13.47,
                        "OnUnderCode": "UNDER",
                        "RecordCreateDate": "2015-06-01T00:00:00-07:00",
                        "RecordUpdateDate": null
                    },
                    "RelatedData": {
                        "Increase": {"Direction": "I", "Lanes": [190, 188], "Document": 1234, "AdvisoryNote": null},
                        "Decrease": null
                    }
                }"#,
            )
            .start()
            .await;

        let crossing = fetch_from_extension(
            &server.client(),
            CrossingLocationId::new(5672),
            "exts/BridgeVC/crossing",
        )
        .await
        .unwrap();

        assert_eq!(crossing.location.id, CrossingLocationId::new(5672));
        assert_eq!(
            crossing.location.created.to_rfc3339(),
            "2015-06-01T07:00:00+00:00"
        );
        let inc = crossing.related.increase.unwrap();
        assert_eq!(inc.direction, Direction::Increase);
        assert_eq!(inc.lanes, LaneClearances::from_complete([190, 188]));
        assert_eq!(
            inc.document.unwrap(),
            server.url("exts/BridgeVC/image/1234")
        );
        assert!(crossing.related.decrease.is_none());
    }

    #[tokio::test]
    async fn conversion_failure_names_url() {
        let server = FixtureServer::builder()
            .json(
                "exts/BridgeVC/crossing/1",
                r#"{"CrossingLocation": {"CrossingLocationId": 1}}"#,
            )
            .start()
            .await;

        let err = fetch_from_extension(
            &server.client(),
            CrossingLocationId::new(1),
            "exts/BridgeVC/crossing",
        )
        .await
        .unwrap_err();

        match err {
            FeatureServiceError::Conversion { url, .. } => {
                assert!(url.ends_with("/exts/BridgeVC/crossing/1"))
            }
            other => panic!("expected conversion error, got {other:?}"),
        }
    }
}
