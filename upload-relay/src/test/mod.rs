//! HTTP-level tests of the upload relay against a mocked Shopify.


use crate::UPLOAD_PATH;
use axum::http::{Method, StatusCode, header};
use axum_test::multipart::MultipartForm;
use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;
use serde_json::{Value, json};
use utils::*;
use wiremock::matchers::{body_partial_json, header as header_matcher, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[test_log::test(tokio::test)]
async fn test_options_preflight_short_circuits_with_cors_headers() {
    let shopify = MockServer::start().await;
    mount_no_calls_expected(&shopify).await;
    let server = create_test_server(create_test_config(&shopify));

    let response = server
        .method(Method::OPTIONS, UPLOAD_PATH)
        .add_header("origin", "https://storefront.example.com")
        .add_header("access-control-request-method", "POST")
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(response.as_bytes().is_empty());

    let headers = response.headers();
    assert_eq!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "*");

    let methods = headers.get(header::ACCESS_CONTROL_ALLOW_METHODS).unwrap().to_str().unwrap();
    assert!(methods.contains("POST") && methods.contains("OPTIONS"), "got {methods}");

    let allowed = headers
        .get(header::ACCESS_CONTROL_ALLOW_HEADERS)
        .unwrap()
        .to_str()
        .unwrap()
        .to_ascii_lowercase();
    assert!(allowed.contains("content-type") && allowed.contains("authorization"), "got {allowed}");
}

#[test_log::test(tokio::test)]
async fn test_bare_options_request_also_answered() {
    let shopify = MockServer::start().await;
    mount_no_calls_expected(&shopify).await;
    let server = create_test_server(create_test_config(&shopify));

    let response = server.method(Method::OPTIONS, UPLOAD_PATH).await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "*");
}

#[test_log::test(tokio::test)]
async fn test_non_post_methods_rejected() {
    let shopify = MockServer::start().await;
    mount_no_calls_expected(&shopify).await;
    let server = create_test_server(create_test_config(&shopify));

    for method in [Method::GET, Method::PUT, Method::DELETE, Method::PATCH] {
        let response = server.method(method.clone(), UPLOAD_PATH).await;

        assert_eq!(response.status_code(), StatusCode::METHOD_NOT_ALLOWED, "{method}");
        assert_eq!(response.json::<Value>(), json!({ "error": "Only POST allowed" }), "{method}");
    }
}

#[test_log::test(tokio::test)]
async fn test_options_rejected_when_cors_disabled() {
    let shopify = MockServer::start().await;
    mount_no_calls_expected(&shopify).await;
    let mut config = create_test_config(&shopify);
    config.cors.enabled = false;
    let server = create_test_server(config);

    let response = server.method(Method::OPTIONS, UPLOAD_PATH).await;

    assert_eq!(response.status_code(), StatusCode::METHOD_NOT_ALLOWED);
    assert!(response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}

#[test_log::test(tokio::test)]
async fn test_all_files_uploaded_in_form_order() {
    let shopify = MockServer::start().await;
    mount_files_endpoint(&shopify, 4).await;
    let server = create_test_server(create_test_config(&shopify));

    // "images" appears first, so all of its files come before "manual"
    let form = MultipartForm::new()
        .add_part("images", file_part("front.png", b"front"))
        .add_text("note", "not a file")
        .add_part("manual", file_part("manual.pdf", b"%PDF"))
        .add_part("images", file_part("back.png", b"back"))
        .add_part("images", file_part("side.png", b"side"));

    let response = server.post(UPLOAD_PATH).multipart(form).await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(
        response.json::<Value>(),
        json!({
            "success": true,
            "urls": [
                public_url_for("front.png"),
                public_url_for("back.png"),
                public_url_for("side.png"),
                public_url_for("manual.pdf"),
            ]
        })
    );

    let sent: Vec<_> = received_upload_bodies(&shopify)
        .await
        .into_iter()
        .map(|body| body["file"]["filename"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(sent, vec!["front.png", "back.png", "side.png", "manual.pdf"]);
}

#[test_log::test(tokio::test)]
async fn test_filename_and_content_round_trip() {
    let shopify = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(FILES_PATH))
        .and(header_matcher("X-Shopify-Access-Token", TEST_TOKEN))
        .and(header_matcher("Content-Type", "application/json"))
        .respond_with(created_file_response)
        .expect(2)
        .mount(&shopify)
        .await;
    let server = create_test_server(create_test_config(&shopify));

    let binary: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
    let form = MultipartForm::new()
        .add_part("file", file_part("Summer photo (1).JPG", &binary))
        .add_part("file", file_part("notes.txt", b"hello\nworld"));

    let response = server.post(UPLOAD_PATH).multipart(form).await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let bodies = received_upload_bodies(&shopify).await;
    assert_eq!(bodies.len(), 2);

    assert_eq!(bodies[0]["file"]["filename"], "Summer photo (1).JPG");
    let decoded = general_purpose::STANDARD
        .decode(bodies[0]["file"]["attachment"].as_str().unwrap())
        .unwrap();
    assert_eq!(decoded, binary);

    assert_eq!(bodies[1]["file"]["filename"], "notes.txt");
    assert_eq!(bodies[1]["file"]["attachment"], "aGVsbG8Kd29ybGQ=");
}

#[test_log::test(tokio::test)]
async fn test_remote_failure_aborts_without_urls() {
    let shopify = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(FILES_PATH))
        .and(body_partial_json(json!({ "file": { "filename": "second.png" } })))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({ "errors": { "attachment": ["is not a valid image"] } })),
        )
        .with_priority(1)
        .expect(1)
        .mount(&shopify)
        .await;
    // Only the first file may succeed; the third must never be sent
    mount_files_endpoint(&shopify, 1).await;

    let server = create_test_server(create_test_config(&shopify));

    let form = MultipartForm::new()
        .add_part("file", file_part("first.png", b"1"))
        .add_part("file", file_part("second.png", b"2"))
        .add_part("file", file_part("third.png", b"3"));

    let response = server.post(UPLOAD_PATH).multipart(form).await;

    assert_eq!(response.status_code(), StatusCode::BAD_GATEWAY);
    let body = response.json::<Value>();
    assert_eq!(
        body,
        json!({
            "error": "Shopify API error",
            "details": { "errors": { "attachment": ["is not a valid image"] } }
        })
    );
    assert!(body.get("urls").is_none());
    assert!(!body.to_string().contains(&public_url_for("first.png")));
}

#[test_log::test(tokio::test)]
async fn test_remote_failure_with_text_body() {
    let shopify = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(FILES_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_string("[API] Invalid API key or access token"))
        .expect(1)
        .mount(&shopify)
        .await;
    let server = create_test_server(create_test_config(&shopify));

    let form = MultipartForm::new().add_part("file", file_part("a.png", b"a"));
    let response = server.post(UPLOAD_PATH).multipart(form).await;

    assert_eq!(response.status_code(), StatusCode::BAD_GATEWAY);
    assert_eq!(
        response.json::<Value>(),
        json!({ "error": "Shopify API error", "details": "[API] Invalid API key or access token" })
    );
}

#[test_log::test(tokio::test)]
async fn test_missing_credentials_rejected_before_any_call() {
    let shopify = MockServer::start().await;
    mount_no_calls_expected(&shopify).await;

    for (store, token) in [(None, Some("token")), (Some("store.myshopify.com"), None), (None, None)] {
        let mut config = create_test_config(&shopify);
        config.shopify.store = store.map(str::to_string);
        config.shopify.access_token = token.map(str::to_string);
        let server = create_test_server(config);

        let form = MultipartForm::new().add_part("file", file_part("a.png", b"a"));
        let response = server.post(UPLOAD_PATH).multipart(form).await;

        assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.json::<Value>(),
            json!({ "error": "Missing SHOPIFY_STORE or SHOPIFY_ACCESS_TOKEN" })
        );
    }
}

#[test_log::test(tokio::test)]
async fn test_missing_boundary_is_parse_error() {
    let shopify = MockServer::start().await;
    mount_no_calls_expected(&shopify).await;
    let server = create_test_server(create_test_config(&shopify));

    let response = server
        .post(UPLOAD_PATH)
        .content_type("multipart/form-data")
        .bytes(Bytes::from_static(b"not multipart at all"))
        .await;

    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.json::<Value>(), json!({ "error": "Form parse error" }));
}

#[test_log::test(tokio::test)]
async fn test_truncated_body_is_parse_error_with_no_partial_relay() {
    let shopify = MockServer::start().await;
    mount_no_calls_expected(&shopify).await;
    let server = create_test_server(create_test_config(&shopify));

    // First part is complete, second is cut off before its closing boundary
    let body = concat!(
        "--XBOUNDARY\r\n",
        "Content-Disposition: form-data; name=\"file\"; filename=\"ok.txt\"\r\n",
        "Content-Type: text/plain\r\n\r\n",
        "complete\r\n",
        "--XBOUNDARY\r\n",
        "Content-Disposition: form-data; name=\"file\"; filename=\"cut.txt\"\r\n",
        "Content-Type: text/plain\r\n\r\n",
        "trunc",
    );

    let response = server
        .post(UPLOAD_PATH)
        .content_type("multipart/form-data; boundary=XBOUNDARY")
        .bytes(Bytes::from_static(body.as_bytes()))
        .await;

    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.json::<Value>(), json!({ "error": "Form parse error" }));
}

#[test_log::test(tokio::test)]
async fn test_body_over_limit_is_parse_error() {
    let shopify = MockServer::start().await;
    mount_no_calls_expected(&shopify).await;
    let mut config = create_test_config(&shopify);
    config.upload.max_body_size = 1024;
    let server = create_test_server(config);

    let form = MultipartForm::new().add_part("file", file_part("big.bin", &[7u8; 8192]));
    let response = server.post(UPLOAD_PATH).multipart(form).await;

    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.json::<Value>(), json!({ "error": "Form parse error" }));
}

#[test_log::test(tokio::test)]
async fn test_form_without_files_succeeds_with_no_urls() {
    let shopify = MockServer::start().await;
    mount_no_calls_expected(&shopify).await;
    let server = create_test_server(create_test_config(&shopify));

    let form = MultipartForm::new().add_text("comment", "nothing attached");
    let response = server.post(UPLOAD_PATH).multipart(form).await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>(), json!({ "success": true, "urls": [] }));
}

#[test_log::test(tokio::test)]
async fn test_blank_file_input_is_skipped() {
    let shopify = MockServer::start().await;
    mount_files_endpoint(&shopify, 1).await;
    let server = create_test_server(create_test_config(&shopify));

    // What a browser sends for a file input with nothing selected, next to a real file
    let body = concat!(
        "--XBOUNDARY\r\n",
        "Content-Disposition: form-data; name=\"avatar\"; filename=\"\"\r\n",
        "Content-Type: application/octet-stream\r\n\r\n",
        "\r\n",
        "--XBOUNDARY\r\n",
        "Content-Disposition: form-data; name=\"file\"; filename=\"real.txt\"\r\n",
        "Content-Type: text/plain\r\n\r\n",
        "content\r\n",
        "--XBOUNDARY--\r\n",
    );

    let response = server
        .post(UPLOAD_PATH)
        .content_type("multipart/form-data; boundary=XBOUNDARY")
        .bytes(Bytes::from_static(body.as_bytes()))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(
        response.json::<Value>(),
        json!({ "success": true, "urls": [public_url_for("real.txt")] })
    );

    let bodies = received_upload_bodies(&shopify).await;
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["file"]["filename"], "real.txt");
}

#[test_log::test(tokio::test)]
async fn test_missing_public_url_returns_raw_body() {
    let shopify = MockServer::start().await;
    let raw = json!({ "file": { "id": 42, "public_url": null } });
    Mock::given(method("POST"))
        .and(path(FILES_PATH))
        .respond_with(ResponseTemplate::new(201).set_body_json(raw.clone()))
        .expect(1)
        .mount(&shopify)
        .await;
    let server = create_test_server(create_test_config(&shopify));

    let form = MultipartForm::new().add_part("file", file_part("pending.png", b"p"));
    let response = server.post(UPLOAD_PATH).multipart(form).await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>(), json!({ "success": true, "urls": [raw] }));
}

#[test_log::test(tokio::test)]
async fn test_unreachable_shopify_is_upload_failure() {
    let shopify = MockServer::start().await;
    let mut config = create_test_config(&shopify);
    // Nothing listens on the discard port
    config.shopify.base_url = Some(url::Url::parse("http://127.0.0.1:9/").unwrap());
    let server = create_test_server(config);

    let form = MultipartForm::new().add_part("file", file_part("a.png", b"a"));
    let response = server.post(UPLOAD_PATH).multipart(form).await;

    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.json::<Value>();
    assert_eq!(body["error"], "Upload failed");
    assert!(body["details"].is_string());
}

#[test_log::test(tokio::test)]
async fn test_concurrent_mode_keeps_order() {
    let shopify = MockServer::start().await;
    mount_files_endpoint(&shopify, 5).await;
    let mut config = create_test_config(&shopify);
    config.upload.concurrency = 3;
    let server = create_test_server(config);

    let names = ["1.png", "2.png", "3.png", "4.png", "5.png"];
    let form = names
        .iter()
        .fold(MultipartForm::new(), |form, name| form.add_part("file", file_part(name, name.as_bytes())));

    let response = server.post(UPLOAD_PATH).multipart(form).await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let expected: Vec<_> = names.iter().map(|n| public_url_for(n)).collect();
    assert_eq!(response.json::<Value>(), json!({ "success": true, "urls": expected }));
}

#[test_log::test(tokio::test)]
async fn test_healthz_and_openapi() {
    let shopify = MockServer::start().await;
    mount_no_calls_expected(&shopify).await;
    let server = create_test_server(create_test_config(&shopify));

    let health = server.get("/healthz").await;
    assert_eq!(health.status_code(), StatusCode::OK);
    assert_eq!(health.text(), "OK");

    let doc = server.get("/openapi.json").await;
    assert_eq!(doc.status_code(), StatusCode::OK);
    let doc = doc.json::<Value>();
    assert!(doc["paths"].get(UPLOAD_PATH).is_some());
    assert!(doc["components"]["schemas"].get("UploadedUrl").is_some());
}
