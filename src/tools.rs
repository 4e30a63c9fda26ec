//! Tools the model can call during a turn.

use std::sync::Arc;

use serde_json::{Value, json};

use crate::catalog::ServiceCatalog;
use crate::errors::CatalogError;
use crate::llm::{ToolDescriptor, ToolExecutor};
use crate::template::TemplateFiller;

pub const GET_SERVICES: &str = "get_services";
pub const GET_SERVICE_BY_INDEX: &str = "get_service_by_index";
pub const UPDATE_SERVICE_PRICES: &str = "update_service_prices";
pub const FILL_TEMPLATE: &str = "fill_template";

/// Catalog and template tools exposed to the model.
pub struct ToolRegistry {
    catalog: Arc<ServiceCatalog>,
    filler: Option<TemplateFiller>,
}

impl ToolRegistry {
    pub fn new(catalog: Arc<ServiceCatalog>) -> Self {
        Self {
            catalog,
            filler: None,
        }
    }

    pub fn with_template(mut self, filler: TemplateFiller) -> Self {
        self.filler = Some(filler);
        self
    }

    fn get_services(&self) -> Value {
        match self.catalog.all() {
            Ok(services) => json!(services),
            Err(e) => error_value(e),
        }
    }

    fn get_service_by_index(&self, arguments: &Value) -> Value {
        let Some(index) = arguments.get("index").and_then(Value::as_i64) else {
            return json!({"error": "Missing integer argument 'index'"});
        };
        match self.catalog.by_index(index) {
            Ok(Some(service)) => json!(service),
            Ok(None) => json!({"error": "Service not found"}),
            Err(e) => error_value(e),
        }
    }

    fn update_service_prices(&self, arguments: &Value) -> Value {
        let name = arguments.get("service_name").and_then(Value::as_str);
        let price = arguments.get("new_price").and_then(Value::as_f64);
        let (Some(name), Some(price)) = (name, price) else {
            return json!({"error": "Expected 'service_name' (string) and 'new_price' (number)"});
        };
        match self.catalog.update_price(name, price) {
            Ok(_) => json!({"message": format!("Price of {} updated to {} SAR", name, price)}),
            Err(CatalogError::ServiceNotFound(_)) => json!({"error": "Service not found"}),
            Err(e) => error_value(e),
        }
    }

    fn fill_template(&self, arguments: &Value) -> Value {
        let Some(filler) = &self.filler else {
            return json!({"error": "No document template configured"});
        };
        let requested = arguments.get("template_path").and_then(Value::as_str);
        let Some(template) = filler.resolve(requested) else {
            return json!({"error": "Template path must be relative to the templates directory"});
        };
        let services = match self.catalog.all() {
            Ok(services) => services,
            Err(e) => return error_value(e),
        };
        match filler.fill(&template, &services) {
            Ok(path) => json!({
                "message": "Template filled and saved",
                "path": path.display().to_string(),
            }),
            Err(e) => error_value(e),
        }
    }
}

fn error_value(error: impl std::fmt::Display) -> Value {
    json!({"error": error.to_string()})
}

impl ToolExecutor for ToolRegistry {
    fn descriptors(&self) -> Vec<ToolDescriptor> {
        let mut tools = vec![
            ToolDescriptor {
                name: GET_SERVICES.to_string(),
                description: "Retrieve the list of all available services with their prices."
                    .to_string(),
                parameters: json!({"type": "object", "properties": {}}),
            },
            ToolDescriptor {
                name: GET_SERVICE_BY_INDEX.to_string(),
                description: "Retrieve one service by its index.".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {"index": {"type": "integer", "description": "Service index"}},
                    "required": ["index"]
                }),
            },
            ToolDescriptor {
                name: UPDATE_SERVICE_PRICES.to_string(),
                description: "Update the price of a service by its exact name.".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "service_name": {"type": "string", "description": "Service name intended by the user"},
                        "new_price": {"type": "number", "description": "New price in SAR"}
                    },
                    "required": ["service_name", "new_price"]
                }),
            },
        ];
        if self.filler.is_some() {
            tools.push(ToolDescriptor {
                name: FILL_TEMPLATE.to_string(),
                description: "Fill the document template with the current services and save it."
                    .to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "template_path": {"type": "string", "description": "Optional template file name"}
                    }
                }),
            });
        }
        tools
    }

    fn call(&self, name: &str, arguments: Value) -> Value {
        tracing::debug!(tool = name, %arguments, "Executing tool");
        match name {
            GET_SERVICES => self.get_services(),
            GET_SERVICE_BY_INDEX => self.get_service_by_index(&arguments),
            UPDATE_SERVICE_PRICES => self.update_service_prices(&arguments),
            FILL_TEMPLATE => self.fill_template(&arguments),
            other => json!({"error": format!("Unknown tool: {}", other)}),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Service;
    use tempfile::TempDir;

    fn registry() -> ToolRegistry {
        ToolRegistry::new(Arc::new(ServiceCatalog::from_services(vec![
            Service::new(1, "Translation", 150.0),
            Service::new(2, "Design", 300.0),
        ])))
    }

    #[test]
    fn test_descriptors_without_template() {
        let names: Vec<String> = registry()
            .descriptors()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(
            names,
            vec![GET_SERVICES, GET_SERVICE_BY_INDEX, UPDATE_SERVICE_PRICES]
        );
    }

    #[test]
    fn test_get_services() {
        let result = registry().call(GET_SERVICES, json!({}));
        assert_eq!(result.as_array().unwrap().len(), 2);
        assert_eq!(result[1]["name"], "Design");
    }

    #[test]
    fn test_get_service_by_index() {
        let tools = registry();
        assert_eq!(
            tools.call(GET_SERVICE_BY_INDEX, json!({"index": 1}))["name"],
            "Translation"
        );
        assert_eq!(
            tools.call(GET_SERVICE_BY_INDEX, json!({"index": 7}))["error"],
            "Service not found"
        );
        assert!(tools.call(GET_SERVICE_BY_INDEX, json!({}))["error"].is_string());
    }

    #[test]
    fn test_update_service_prices() {
        let tools = registry();
        let result = tools.call(
            UPDATE_SERVICE_PRICES,
            json!({"service_name": "Design", "new_price": 320}),
        );
        assert!(result["message"].as_str().unwrap().contains("Design"));
        assert_eq!(
            tools.call(GET_SERVICE_BY_INDEX, json!({"index": 2}))["price"],
            320.0
        );

        let missing = tools.call(
            UPDATE_SERVICE_PRICES,
            json!({"service_name": "Printing", "new_price": 1}),
        );
        assert_eq!(missing["error"], "Service not found");
    }

    #[test]
    fn test_unknown_tool() {
        let result = registry().call("delete_everything", json!({}));
        assert!(result["error"].as_str().unwrap().contains("delete_everything"));
    }

    #[test]
    fn test_fill_template_without_filler() {
        let result = registry().call(FILL_TEMPLATE, json!({}));
        assert!(result["error"].is_string());
    }

    #[test]
    fn test_fill_template_writes_output() {
        let dir = TempDir::new().unwrap();
        let template = dir.path().join("templates/invoice.txt");
        std::fs::create_dir_all(template.parent().unwrap()).unwrap();
        std::fs::write(&template, "{% for s in services %}{{ s.name }};{% endfor %}").unwrap();
        let output = dir.path().join("outputs/invoice.txt");

        let tools = registry().with_template(TemplateFiller::new(template, output.clone()));
        assert_eq!(tools.descriptors().len(), 4);

        let result = tools.call(FILL_TEMPLATE, json!({}));
        assert_eq!(result["message"], "Template filled and saved");
        assert_eq!(
            std::fs::read_to_string(output).unwrap(),
            "Translation;Design;"
        );

        let escaped = tools.call(FILL_TEMPLATE, json!({"template_path": "../x"}));
        assert!(escaped["error"].is_string());
    }
}
