use vidbatch_core::{ConfigurationError, RunInput, DEFAULT_PROXY_GROUP};

#[test]
fn defaults_fill_missing_keys() {
    let input = RunInput::from_json(r#"{"videoUrls": ["https://x/a"]}"#).unwrap();
    assert_eq!(input.quality, "best");
    assert_eq!(input.proxy_type, DEFAULT_PROXY_GROUP);
    assert_eq!(input.proxy_group(), Some("RESIDENTIAL"));
}

#[test]
fn none_proxy_type_disables_proxying() {
    let input = RunInput::from_json(
        r#"{"videoUrls": ["https://x/a"], "quality": "worst", "proxyType": "none"}"#,
    )
    .unwrap();
    assert_eq!(input.quality, "worst");
    assert_eq!(input.proxy_group(), None);
}

#[test]
fn empty_url_list_is_rejected() {
    let input = RunInput::from_json(r#"{"videoUrls": []}"#).unwrap();
    assert!(matches!(
        input.validated(),
        Err(ConfigurationError::EmptyUrlList)
    ));

    let missing = RunInput::from_json("{}").unwrap();
    assert!(matches!(
        missing.validated(),
        Err(ConfigurationError::EmptyUrlList)
    ));
}

#[test]
fn blank_urls_are_dropped_before_validation() {
    let input = RunInput {
        video_urls: vec!["  https://x/a ".to_string(), "   ".to_string()],
        ..RunInput::default()
    };
    let validated = input.validated().unwrap();
    assert_eq!(validated.video_urls, vec!["https://x/a".to_string()]);

    let only_blanks = RunInput {
        video_urls: vec![" ".to_string(), String::new()],
        ..RunInput::default()
    };
    assert!(only_blanks.validated().is_err());
}

#[test]
fn malformed_json_is_a_configuration_error() {
    let err = RunInput::from_json("{not json").unwrap_err();
    assert!(matches!(err, ConfigurationError::Json(_)));
    assert!(err.to_string().starts_with("input is not valid JSON"));
}
