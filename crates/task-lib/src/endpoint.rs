//! Service endpoints.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};
use crate::task::{Task, lock};

/// Authorization details of a service endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointAuthorization {
    /// Auth scheme such as `OAuth` or `UsernamePassword`.
    pub scheme: String,
    /// Scheme-specific auth data.
    #[serde(default)]
    pub parameters: HashMap<String, String>,
}

impl Task {
    fn endpoint_value(&self, id: &str, key: String, optional: bool) -> Result<Option<String>> {
        let value = lock(&self.vars).env(&key).map(str::to_string);
        match value {
            None if !optional => Err(Error::EndpointNotPresent {
                id: id.to_string(),
                key,
            }),
            value => Ok(value),
        }
    }

    /// Gets the URL of a service endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EndpointNotPresent`] if the URL is unset and not
    /// `optional`, or [`Error::Url`] if it does not parse.
    pub fn get_endpoint_url(&self, id: &str, optional: bool) -> Result<Option<Url>> {
        let value = self.endpoint_value(id, format!("ENDPOINT_URL_{id}"), optional)?;
        self.debug(format!("{id}={}", value.as_deref().unwrap_or("undefined")));
        value.map(|v| Url::parse(&v)).transpose().map_err(Error::from)
    }

    /// Gets a data parameter of a service endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EndpointNotPresent`] if unset and not `optional`.
    pub fn get_endpoint_data_parameter(
        &self,
        id: &str,
        key: &str,
        optional: bool,
    ) -> Result<Option<String>> {
        let env_key = format!("ENDPOINT_DATA_{id}_{}", key.to_uppercase());
        let value = self.endpoint_value(id, env_key, optional)?;
        self.debug(format!(
            "{id} data {key} = {}",
            value.as_deref().unwrap_or("undefined")
        ));
        Ok(value)
    }

    /// Gets the authorization scheme of a service endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EndpointNotPresent`] if unset and not `optional`.
    pub fn get_endpoint_authorization_scheme(
        &self,
        id: &str,
        optional: bool,
    ) -> Result<Option<String>> {
        let value = self.endpoint_value(id, format!("ENDPOINT_AUTH_SCHEME_{id}"), optional)?;
        self.debug(format!(
            "{id} auth scheme = {}",
            value.as_deref().unwrap_or("undefined")
        ));
        Ok(value)
    }

    /// Gets an authorization parameter of a service endpoint.
    ///
    /// The value is never written to the debug log.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EndpointNotPresent`] if unset and not `optional`.
    pub fn get_endpoint_authorization_parameter(
        &self,
        id: &str,
        key: &str,
        optional: bool,
    ) -> Result<Option<String>> {
        let env_key = format!("ENDPOINT_AUTH_PARAMETER_{id}_{}", key.to_uppercase());
        let value = self.endpoint_value(id, env_key, optional)?;
        self.debug(format!("{id} auth param {key} = {}", present(&value)));
        Ok(value)
    }

    /// Gets the full authorization of a service endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EndpointNotPresent`] if unset and not `optional`, or
    /// [`Error::InvalidEndpointAuth`] if the payload is not valid JSON.
    pub fn get_endpoint_authorization(
        &self,
        id: &str,
        optional: bool,
    ) -> Result<Option<EndpointAuthorization>> {
        let value = self.endpoint_value(id, format!("ENDPOINT_AUTH_{id}"), optional)?;
        self.debug(format!("{id} exists {}", value.is_some()));
        value
            .map(|raw| {
                serde_json::from_str(&raw).map_err(|source| Error::InvalidEndpointAuth {
                    id: id.to_string(),
                    source,
                })
            })
            .transpose()
    }
}

fn present(value: &Option<String>) -> &'static str {
    if value.is_some() { "***" } else { "undefined" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::captured_task;

    const ID: &str = "a0b1c2";

    #[test]
    fn reads_endpoint_url() {
        let (task, _) = captured_task(&[("ENDPOINT_URL_a0b1c2", "https://dev.example.com/org/")]);
        let url = task.get_endpoint_url(ID, false).unwrap().unwrap();
        assert_eq!(url.host_str(), Some("dev.example.com"));
        assert_eq!(url.path(), "/org/");
    }

    #[test]
    fn missing_required_endpoint_fails() {
        let (task, _) = captured_task(&[]);
        assert!(matches!(
            task.get_endpoint_url(ID, false),
            Err(Error::EndpointNotPresent { .. })
        ));
        assert!(task.get_endpoint_authorization(ID, false).is_err());
        assert!(task.get_endpoint_authorization_scheme(ID, false).is_err());
        assert!(task.get_endpoint_data_parameter(ID, "k", false).is_err());
        assert!(task.get_endpoint_authorization_parameter(ID, "k", false).is_err());
    }

    #[test]
    fn missing_optional_endpoint_is_none() {
        let (task, _) = captured_task(&[]);
        assert_eq!(task.get_endpoint_url(ID, true).unwrap(), None);
        assert_eq!(task.get_endpoint_authorization(ID, true).unwrap(), None);
    }

    #[test]
    fn invalid_url_is_an_error() {
        let (task, _) = captured_task(&[("ENDPOINT_URL_a0b1c2", "not a url")]);
        assert!(matches!(task.get_endpoint_url(ID, false), Err(Error::Url(_))));
    }

    #[test]
    fn parameter_keys_are_upper_cased() {
        let (task, out) = captured_task(&[
            ("ENDPOINT_DATA_a0b1c2_SUBSCRIPTIONID", "sub-1"),
            ("ENDPOINT_AUTH_PARAMETER_a0b1c2_PASSWORD", "pw"),
            ("ENDPOINT_AUTH_SCHEME_a0b1c2", "UsernamePassword"),
        ]);
        assert_eq!(
            task.get_endpoint_data_parameter(ID, "subscriptionId", false)
                .unwrap()
                .as_deref(),
            Some("sub-1")
        );
        assert_eq!(
            task.get_endpoint_authorization_parameter(ID, "password", false)
                .unwrap()
                .as_deref(),
            Some("pw")
        );
        assert_eq!(
            task.get_endpoint_authorization_scheme(ID, false)
                .unwrap()
                .as_deref(),
            Some("UsernamePassword")
        );
        assert!(!out.contents().contains("pw\n"));
    }

    #[test]
    fn parses_authorization_json() {
        let (task, out) = captured_task(&[(
            "ENDPOINT_AUTH_a0b1c2",
            r#"{"scheme":"UsernamePassword","parameters":{"username":"u","password":"p4ss"}}"#,
        )]);
        let auth = task.get_endpoint_authorization(ID, false).unwrap().unwrap();
        assert_eq!(auth.scheme, "UsernamePassword");
        assert_eq!(auth.parameters["username"], "u");
        assert!(!out.contents().contains("p4ss"));
    }

    #[test]
    fn malformed_authorization_json_fails() {
        let (task, _) = captured_task(&[("ENDPOINT_AUTH_a0b1c2", "{oops")]);
        assert!(matches!(
            task.get_endpoint_authorization(ID, false),
            Err(Error::InvalidEndpointAuth { .. })
        ));
    }
}
