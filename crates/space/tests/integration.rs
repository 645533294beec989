//! Integration tests for space lookups

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use relsync_errors::{Error, NetworkError, SpaceError};
    use relsync_space::*;
    use relsync_state::{queries, MetadataStore, PoolSettings};
    use std::time::Duration;
    use tempfile::TempDir;

    fn client(server: &MockServer) -> HttpSpaceLookup {
        HttpSpaceLookup::new(SpaceApiConfig::new(server.url("/api/space"))).unwrap()
    }

    #[tokio::test]
    async fn test_http_lookup_returns_business_id() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/space/get_space_detail/")
                .query_param("space_uid", "bkci__proj");
            then.status(200).json_body(serde_json::json!({
                "result": true,
                "code": 200,
                "message": "OK",
                "data": {"space_uid": "bkci__proj", "bk_biz_id": -42}
            }));
        });

        let detail = client(&server).get_space_detail("bkci__proj").await.unwrap();

        mock.assert();
        assert_eq!(detail.bk_biz_id, -42);
        assert_eq!(detail.space_uid, "bkci__proj");
    }

    #[tokio::test]
    async fn test_http_lookup_sends_token() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/space/get_space_detail/")
                .header("authorization", "Bearer secret");
            then.status(200).json_body(serde_json::json!({
                "result": true,
                "data": {"bk_biz_id": 7}
            }));
        });

        let lookup = HttpSpaceLookup::new(
            SpaceApiConfig::new(server.url("/api/space/")).with_token(Some("secret".to_string())),
        )
        .unwrap();
        let detail = lookup.get_space_detail("bkcc__7").await.unwrap();

        mock.assert();
        assert_eq!(detail.bk_biz_id, 7);
    }

    #[tokio::test]
    async fn test_http_404_is_not_found() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/space/get_space_detail/");
            then.status(404);
        });

        let err = client(&server).get_space_detail("bkci__gone").await.unwrap_err();
        assert!(err.is_space_not_found());
    }

    #[tokio::test]
    async fn test_envelope_404_is_not_found() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/space/get_space_detail/");
            then.status(200).json_body(serde_json::json!({
                "result": false,
                "code": 404,
                "message": "space not found",
                "data": null
            }));
        });

        let err = client(&server).get_space_detail("bkci__gone").await.unwrap_err();
        assert!(err.is_space_not_found());
    }

    #[tokio::test]
    async fn test_envelope_rejection_and_server_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET)
                .path("/api/space/get_space_detail/")
                .query_param("space_uid", "bkci__denied");
            then.status(200).json_body(serde_json::json!({
                "result": false,
                "code": 403,
                "message": "forbidden"
            }));
        });
        server.mock(|when, then| {
            when.method(GET)
                .path("/api/space/get_space_detail/")
                .query_param("space_uid", "bkci__broken");
            then.status(500);
        });

        let lookup = client(&server);
        let err = lookup.get_space_detail("bkci__denied").await.unwrap_err();
        assert!(matches!(err, Error::Space(SpaceError::Rejected { .. })));

        let err = lookup.get_space_detail("bkci__broken").await.unwrap_err();
        assert!(matches!(
            err,
            Error::Network(NetworkError::HttpError { status: 500, .. })
        ));
        assert!(!err.is_space_not_found());
    }

    #[tokio::test]
    async fn test_invalid_body_is_reported() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/space/get_space_detail/");
            then.status(200).body("<html>");
        });

        let err = client(&server).get_space_detail("bkci__p").await.unwrap_err();
        assert!(matches!(
            err,
            Error::Network(NetworkError::InvalidResponse { .. })
        ));
    }

    #[test]
    fn test_rejects_non_http_base_url() {
        let result = HttpSpaceLookup::new(
            SpaceApiConfig::new("ftp://example").with_timeout(Duration::from_secs(1)),
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_store_lookup() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("relsync.sqlite");
        let store = MetadataStore::open(&db_path, PoolSettings::default())
            .await
            .unwrap();
        let mut tx = store.pool().begin().await.unwrap();
        queries::insert_space(&mut tx, "bkcc", "2", "", "blueking").await.unwrap();
        let project_row = queries::insert_space(&mut tx, "bkci", "proj", "proj-code", "project")
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let lookup = StoreSpaceLookup::new(store);
        assert_eq!(lookup.get_space_detail("bkcc__2").await.unwrap().bk_biz_id, 2);
        assert_eq!(
            lookup.get_space_detail("bkci__proj").await.unwrap().bk_biz_id,
            -project_row
        );
        assert!(lookup
            .get_space_detail("bkci__missing")
            .await
            .unwrap_err()
            .is_space_not_found());
        assert!(matches!(
            lookup.get_space_detail("nonsense").await.unwrap_err(),
            Error::Space(SpaceError::InvalidUid { .. })
        ));
    }
}
