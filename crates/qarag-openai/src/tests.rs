//! Snapshot tests for the OpenAI client

#[cfg(test)]
mod snapshot_tests {
    use crate::{LLMProvider, OpenAIClient, OpenAIConfig};
    use insta::assert_yaml_snapshot;
    use std::time::Duration;

    #[test]
    fn test_config_snapshot() {
        let config = OpenAIConfig::new("sk-test".to_string())
            .with_model("gpt-4o-mini")
            .with_timeout(Duration::from_secs(30));

        assert_yaml_snapshot!(config, {
            ".api_key" => "[redacted]",
        }, @r###"
        ---
        api_key: "[redacted]"
        api_url: "https://api.openai.com/v1"
        model_id: gpt-4o-mini
        timeout:
          secs: 30
          nanos: 0
        "###);
    }

    #[test]
    fn test_default_model() {
        let client = OpenAIClient::new(OpenAIConfig::new("sk-test".to_string())).unwrap();
        assert_eq!(client.default_model(), "gpt-3.5-turbo");
    }
}
