use std::io::Write;

use pretty_assertions::assert_eq;

use super::*;

#[test]
fn empty_configuration_uses_defaults() {
    let configuration: Configuration = "".parse().unwrap();
    assert_eq!(configuration.server.listen(), "127.0.0.1:4000".parse().unwrap());
    assert_eq!(configuration.server.path(), "/graphql");
    assert_eq!(configuration.server.schema_path(), "/graphql/schema");
    assert_eq!(configuration.server.query_key(), "query");
    assert_eq!(configuration.server.variables_key(), "variables");
    assert_eq!(configuration.server.upload_part_name(), "file");
    assert_eq!(configuration.server.max_request_bytes(), 2_000_000);
    assert_eq!(configuration.document_cache.capacity.get(), 10_000);
    assert!(configuration.schemas.is_empty());
}

#[test]
fn full_configuration() {
    let configuration: Configuration = r#"
server:
  listen: 0.0.0.0:8080
  path: /api
  query_key: q
  variables_key: vars
  upload_part_name: attachment
  max_request_bytes: 1024
document_cache:
  capacity: 42
schemas:
  - name: starwars
    sdl: starwars.graphql
    data: starwars.json
  - name: startrek
    sdl: startrek.graphql
"#
    .parse()
    .unwrap();

    assert_eq!(configuration.server.listen(), "0.0.0.0:8080".parse().unwrap());
    assert_eq!(configuration.server.path(), "/api");
    assert_eq!(configuration.server.query_key(), "q");
    assert_eq!(configuration.server.variables_key(), "vars");
    assert_eq!(configuration.server.upload_part_name(), "attachment");
    assert_eq!(configuration.server.max_request_bytes(), 1024);
    assert_eq!(configuration.document_cache.capacity.get(), 42);
    assert_eq!(
        configuration.schemas,
        vec![
            SchemaSource {
                name: "starwars".to_string(),
                sdl: "starwars.graphql".into(),
                data: Some("starwars.json".into()),
            },
            SchemaSource {
                name: "startrek".to_string(),
                sdl: "startrek.graphql".into(),
                data: None,
            },
        ]
    );
}

#[test]
fn blank_keys_fall_back_to_defaults() {
    let configuration: Configuration = r#"
server:
  query_key: ""
  variables_key: "  "
  upload_part_name: ""
"#
    .parse()
    .unwrap();
    assert_eq!(configuration.server.query_key(), "query");
    assert_eq!(configuration.server.variables_key(), "variables");
    assert_eq!(configuration.server.upload_part_name(), "file");
}

#[test]
fn rejects_unknown_fields() {
    let err = "server:\n  listen_on: 1.2.3.4:5\n"
        .parse::<Configuration>()
        .unwrap_err();
    assert!(matches!(err, ConfigurationError::Deserialize(_)));
}

#[test]
fn rejects_zero_capacity() {
    let err = "document_cache:\n  capacity: 0\n"
        .parse::<Configuration>()
        .unwrap_err();
    assert!(matches!(err, ConfigurationError::Deserialize(_)));
}

#[test]
fn rejects_invalid_paths() {
    for path in ["graphql", "/graphql/"] {
        let err = format!("server:\n  path: {path}\n")
            .parse::<Configuration>()
            .unwrap_err();
        assert!(
            matches!(err, ConfigurationError::InvalidPath(ref invalid) if invalid == path),
            "{path}"
        );
    }
    let err = Configuration::builder()
        .server(Server::builder().path("nope").build())
        .build()
        .unwrap_err();
    assert!(matches!(err, ConfigurationError::InvalidPath(_)));
}

#[test]
fn root_path() {
    let configuration: Configuration = "server:\n  path: /\n".parse().unwrap();
    assert_eq!(configuration.server.schema_path(), "/schema");
}

#[test]
fn from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "server:\n  path: /gql").unwrap();
    let configuration = Configuration::from_file(file.path()).unwrap();
    assert_eq!(configuration.server.path(), "/gql");

    let err = Configuration::from_file(Path::new("/definitely/not/here.yaml")).unwrap_err();
    assert!(matches!(err, ConfigurationError::Read { .. }));
}

#[test]
fn config_schema() {
    let schema = serde_json::to_value(generate_config_schema()).unwrap();
    let path = &schema["properties"]["server"]["properties"]["path"];
    assert_eq!(path["default"], "/graphql");
    assert!(
        path["description"]
            .as_str()
            .unwrap()
            .starts_with("The HTTP path on which GraphQL requests will be served.")
    );
    assert!(schema["properties"]["schemas"].is_object());
    assert!(schema["properties"]["document_cache"].is_object());
}
