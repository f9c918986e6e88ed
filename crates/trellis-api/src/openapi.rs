//! # OpenAPI Document
//!
//! Generated from the module registry at build time and served at
//! `{api_prefix}/openapi.json` when enabled.
//!
//! Each module becomes a tag (its name, or its prefix when unnamed) and each
//! route an operation whose id is the controller method name. Every
//! response is documented as the [`Envelope`] schema.

use std::collections::HashSet;
use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use trellis_core::{Envelope, FrameworkConfig};
use utoipa::openapi::path::{HttpMethod as OpenApiMethod, OperationBuilder, ParameterBuilder, ParameterIn};
use utoipa::openapi::request_body::RequestBodyBuilder;
use utoipa::openapi::tag::TagBuilder;
use utoipa::openapi::{
    ComponentsBuilder, ContentBuilder, InfoBuilder, OpenApi, OpenApiBuilder, PathItem, PathsBuilder, Ref,
    Required, ResponseBuilder,
};

use crate::dispatch::{group_by_path, join_path};
use crate::routing::{HttpMethod, ModuleRegistry};

/// Title, version and description of the generated document.
#[derive(Debug, Clone)]
pub struct ApiInfo {
    /// Document title.
    pub title: String,
    /// API version.
    pub version: String,
    /// Optional description.
    pub description: Option<String>,
}

impl Default for ApiInfo {
    fn default() -> Self {
        Self {
            title: "Trellis API".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: None,
        }
    }
}

fn method_of(method: HttpMethod) -> OpenApiMethod {
    match method {
        HttpMethod::Get => OpenApiMethod::Get,
        HttpMethod::Post => OpenApiMethod::Post,
        HttpMethod::Put => OpenApiMethod::Put,
        HttpMethod::Patch => OpenApiMethod::Patch,
        HttpMethod::Delete => OpenApiMethod::Delete,
    }
}

/// Names of `{param}` and `{*param}` segments.
fn path_params(path: &str) -> Vec<&str> {
    path.split('/')
        .filter_map(|segment| segment.strip_prefix('{')?.strip_suffix('}'))
        .map(|name| name.trim_start_matches('*'))
        .collect()
}

fn envelope_response(description: &str) -> utoipa::openapi::Response {
    ResponseBuilder::new()
        .description(description)
        .content(
            "application/json",
            ContentBuilder::new()
                .schema(Some(Ref::from_schema_name("Envelope")))
                .build(),
        )
        .build()
}

/// Build the document for every registered route.
pub fn document(modules: &ModuleRegistry, config: &FrameworkConfig, info: &ApiInfo) -> OpenApi {
    let mut tags = Vec::new();
    let mut operations = Vec::new();
    let mut used_ids: HashSet<String> = HashSet::new();

    for module in modules.modules() {
        let tag = module
            .module_name()
            .map(str::to_string)
            .unwrap_or_else(|| join_path(&[module.prefix()]));
        tags.push(
            TagBuilder::new()
                .name(tag.clone())
                .description(module.module_description())
                .build(),
        );

        for route in module.routes() {
            let path = join_path(&[config.api_prefix.as_str(), module.prefix(), route.path()]);

            let mut operation_id = route.handler_name().to_string();
            let mut n = 2;
            while !used_ids.insert(operation_id.clone()) {
                operation_id = format!("{}_{n}", route.handler_name());
                n += 1;
            }

            let mut operation_tags = vec![tag.clone()];
            operation_tags.extend(module.module_tags().iter().cloned());

            let mut builder = OperationBuilder::new()
                .tags(Some(operation_tags))
                .operation_id(Some(operation_id))
                .summary(Some(format!("{}::{}", route.controller_name(), route.handler_name())))
                .response("200", envelope_response("Success envelope"))
                .response("400", envelope_response("Validation failure or malformed body"))
                .response("500", envelope_response("Unhandled error"));
            for name in path_params(&path) {
                builder = builder.parameter(
                    ParameterBuilder::new()
                        .name(name)
                        .parameter_in(ParameterIn::Path)
                        .required(Required::True)
                        .build(),
                );
            }
            if matches!(route.method(), HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch) {
                builder = builder.request_body(Some(
                    RequestBodyBuilder::new()
                        .content("application/json", ContentBuilder::new().build())
                        .build(),
                ));
            }

            operations.push((path, (route.method(), builder.build())));
        }
    }

    let mut paths = PathsBuilder::new();
    for (path, ops) in group_by_path(operations) {
        let mut item = PathItem::default();
        for (method, operation) in ops {
            let slot = match method_of(method) {
                OpenApiMethod::Get => &mut item.get,
                OpenApiMethod::Post => &mut item.post,
                OpenApiMethod::Put => &mut item.put,
                OpenApiMethod::Patch => &mut item.patch,
                OpenApiMethod::Delete => &mut item.delete,
                _ => continue,
            };
            *slot = Some(operation);
        }
        paths = paths.path(path, item);
    }

    OpenApiBuilder::new()
        .info(
            InfoBuilder::new()
                .title(info.title.clone())
                .version(info.version.clone())
                .description(info.description.clone())
                .build(),
        )
        .paths(paths.build())
        .components(Some(ComponentsBuilder::new().schema_from::<Envelope>().build()))
        .tags(Some(tags))
        .build()
}

/// Router serving `doc` at `path`.
pub(crate) fn router(path: &str, doc: OpenApi) -> Router {
    let doc = Arc::new(doc);
    Router::new().route(
        path,
        get(move || {
            let doc = Arc::clone(&doc);
            async move { Json(doc.as_ref().clone()) }
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reply::HandlerResult;
    use crate::request::RequestContext;
    use crate::routing::{create_module, ModuleDefinition};
    use crate::Reply;

    struct Items;

    impl Items {
        async fn list(self: Arc<Self>, _req: RequestContext) -> HandlerResult {
            Ok(Reply::Empty)
        }

        async fn show(self: Arc<Self>, _req: RequestContext) -> HandlerResult {
            Ok(Reply::Empty)
        }
    }

    fn registry() -> ModuleRegistry {
        let mut registry = ModuleRegistry::new();
        registry.register(
            create_module("/items", Items, |r| {
                vec![
                    r.get("/", Items::list),
                    r.post("/", Items::list),
                    r.get("/{id}", Items::show),
                ]
            })
            .name("Items")
            .description("Inventory")
            .tags(["inventory"]),
        );
        registry.register(create_module("/legacy", Items, |r| vec![r.get("/", Items::list)]));
        registry.register(ModuleDefinition::new("/empty"));
        registry
    }

    #[test]
    fn extracts_path_params() {
        assert_eq!(path_params("/api/items/{id}/parts/{*rest}"), ["id", "rest"]);
        assert!(path_params("/api/items").is_empty());
    }

    #[test]
    fn document_lists_every_route() {
        let doc = document(&registry(), &FrameworkConfig::default(), &ApiInfo::default());
        let json = serde_json::to_value(&doc).unwrap();

        let items = &json["paths"]["/api/items"];
        assert_eq!(items["get"]["operationId"], "list");
        assert_eq!(items["post"]["operationId"], "list_2");
        assert_eq!(items["get"]["tags"], serde_json::json!(["Items", "inventory"]));

        let show = &json["paths"]["/api/items/{id}"]["get"];
        assert_eq!(show["operationId"], "show");
        assert_eq!(show["parameters"][0]["name"], "id");
        assert_eq!(show["parameters"][0]["in"], "path");

        assert_eq!(json["paths"]["/api/legacy"]["get"]["tags"][0], "/legacy");
        assert_eq!(json["tags"][0]["name"], "Items");
        assert_eq!(json["tags"][0]["description"], "Inventory");
        assert!(json["components"]["schemas"]["Envelope"].is_object());
        assert_eq!(json["info"]["title"], "Trellis API");
    }
}
