//! Drives `ChatBackend` against a one-shot local HTTP stub.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use locsync_core::{BackendConfig, BatchRequest};
use locsync_translate::{
    ChatBackend, ChatFactory, TranslateError, Translator, TranslatorContext, TranslatorFactory,
};
use serde_json::{json, Value};

/// Serve one request with `status` and `body`; the request body is sent back
/// over the returned channel.
fn serve_once(status: u16, body: String) -> (String, mpsc::Receiver<Value>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let base_url = format!("http://{}", listener.local_addr().expect("addr"));
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept");
        let mut reader = BufReader::new(stream.try_clone().expect("clone"));
        let mut content_length = 0usize;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).expect("header line");
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                if name.eq_ignore_ascii_case("content-length") {
                    content_length = value.trim().parse().expect("length");
                }
            }
        }
        let mut request = vec![0u8; content_length];
        reader.read_exact(&mut request).expect("body");
        tx.send(serde_json::from_slice(&request).expect("json request"))
            .expect("send");

        let mut stream = stream;
        write!(
            stream,
            "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
        .expect("respond");
    });
    (base_url, rx)
}

fn backend(base_url: String) -> ChatBackend {
    let config = BackendConfig {
        base_url,
        timeout: Duration::from_secs(5),
        ..BackendConfig::default()
    };
    let mut context = TranslatorContext::new("English", "French");
    context.instructions = Some("Use \"vous\".".into());
    ChatBackend::new(&config, "test-key".into(), context)
}

fn completion(content: &str) -> String {
    json!({ "choices": [{ "message": { "role": "assistant", "content": content } }] }).to_string()
}

#[tokio::test]
async fn single_translation_round_trip() {
    let (url, requests) = serve_once(200, completion("Enregistrer"));
    let text = backend(url)
        .translate("Save", "button label")
        .await
        .expect("translate");
    assert_eq!(text, "Enregistrer");

    let request = requests.recv().expect("request seen");
    assert_eq!(request["model"], BackendConfig::default().model);
    let system = request["messages"][0]["content"].as_str().expect("system");
    assert!(system.contains("to French"));
    assert!(system.contains("Use \"vous\"."));
    assert!(request.get("response_format").is_none());
}

#[tokio::test]
async fn batch_translation_requests_json_object() {
    let (url, requests) = serve_once(
        200,
        completion("{\"save\": \"Enregistrer\", \"quit\": \"Quitter\"}"),
    );
    let batch = vec![
        BatchRequest {
            key: "save".into(),
            text: "Save".into(),
            description: String::new(),
        },
        BatchRequest {
            key: "quit".into(),
            text: "Quit".into(),
            description: "menu item".into(),
        },
    ];
    let result = backend(url).translate_batch(&batch).await.expect("batch");
    assert_eq!(result["quit"], "Quitter");

    let request = requests.recv().expect("request seen");
    assert_eq!(request["response_format"]["type"], "json_object");
    let user = request["messages"][1]["content"].as_str().expect("user");
    assert!(user.contains("menu item"));
}

#[tokio::test]
async fn http_error_is_a_backend_error() {
    let (url, _requests) = serve_once(429, "{\"error\":\"rate limited\"}".into());
    let err = backend(url).translate("Save", "").await.unwrap_err();
    match err {
        TranslateError::Backend(message) => {
            assert!(message.contains("429"));
            assert!(message.contains("rate limited"));
        }
        other => panic!("expected backend error, got {other:?}"),
    }
}

#[tokio::test]
async fn reply_without_choices_is_invalid() {
    let (url, _requests) = serve_once(200, "{\"choices\": []}".into());
    let err = backend(url).translate("Save", "").await.unwrap_err();
    assert!(matches!(err, TranslateError::InvalidResponse(_)));
}

#[test]
fn factory_requires_api_key() {
    let config = BackendConfig {
        api_key_env: "LOCSYNC_TEST_KEY_THAT_IS_NEVER_SET".into(),
        ..BackendConfig::default()
    };
    let err = ChatFactory::new(config)
        .create(TranslatorContext::new("English", "French"))
        .map(|_| ())
        .unwrap_err();
    match err {
        TranslateError::MissingApiKey { var } => {
            assert_eq!(var, "LOCSYNC_TEST_KEY_THAT_IS_NEVER_SET")
        }
        other => panic!("expected missing key, got {other:?}"),
    }
}
