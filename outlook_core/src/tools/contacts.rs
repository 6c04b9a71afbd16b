use reqwest::Method;
use rmcp::model::JsonObject;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{put, user_path, ListOptions, Query};
use crate::client::{GraphClient, GraphRequest};
use crate::error::OutlookError;

/// Contact properties shared by create and update.
#[derive(Debug, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContactFields {
    pub given_name: Option<String>,
    pub surname: Option<String>,
    pub display_name: Option<String>,
    /// e.g. `[{"address": "ada@contoso.com", "name": "Ada"}]`
    pub email_addresses: Option<Vec<JsonObject>>,
    pub business_phones: Option<Vec<String>>,
    pub mobile_phone: Option<String>,
    pub company_name: Option<String>,
    pub department: Option<String>,
    pub job_title: Option<String>,
    pub office_location: Option<String>,
    /// ISO 8601 date, e.g. 1990-04-21T00:00:00Z
    pub birthday: Option<String>,
    pub categories: Option<Vec<String>>,
    /// Free-form notes, stored as personalNotes
    pub notes: Option<String>,
}

impl ContactFields {
    fn into_body(self, home_phones: Option<Vec<String>>) -> JsonObject {
        let mut body = JsonObject::new();
        put(&mut body, "givenName", self.given_name);
        put(&mut body, "surname", self.surname);
        put(&mut body, "displayName", self.display_name);
        put(&mut body, "emailAddresses", self.email_addresses);
        put(&mut body, "businessPhones", self.business_phones);
        put(&mut body, "mobilePhone", self.mobile_phone);
        put(&mut body, "homePhones", home_phones);
        put(&mut body, "companyName", self.company_name);
        put(&mut body, "department", self.department);
        put(&mut body, "jobTitle", self.job_title);
        put(&mut body, "officeLocation", self.office_location);
        put(&mut body, "birthday", self.birthday);
        put(&mut body, "categories", self.categories);
        put(&mut body, "personalNotes", self.notes);
        body
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateContactParams {
    #[serde(flatten)]
    pub fields: ContactFields,
    /// Single home phone number
    #[serde(rename = "homePhone")]
    pub home_phone: Option<String>,
    pub user_id: Option<String>,
}

pub async fn create_contact(
    client: &GraphClient,
    p: CreateContactParams,
) -> Result<Value, OutlookError> {
    let body = p.fields.into_body(p.home_phone.map(|phone| vec![phone]));
    let path = format!("{}/contacts", user_path(p.user_id.as_deref()));
    client.post(&path, Value::Object(body)).await
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetContactParams {
    pub contact_id: String,
    pub user_id: Option<String>,
}

pub async fn get_contact(client: &GraphClient, p: GetContactParams) -> Result<Value, OutlookError> {
    let path = format!("{}/contacts/{}", user_path(p.user_id.as_deref()), p.contact_id);
    client.get(&path, Vec::new()).await
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetContactFoldersParams {
    #[serde(flatten)]
    pub options: ListOptions,
    /// Relationships to expand, e.g. childFolders
    pub expand: Option<Vec<String>>,
    pub user_id: Option<String>,
}

pub async fn get_contact_folders(
    client: &GraphClient,
    p: GetContactFoldersParams,
) -> Result<Value, OutlookError> {
    let query = p
        .options
        .query()
        .list("$expand", p.expand.as_deref())
        .build();
    let path = format!("{}/contactFolders", user_path(p.user_id.as_deref()));
    client.get(&path, query).await
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DeleteContactParams {
    pub contact_id: String,
    pub user_id: Option<String>,
}

pub async fn delete_contact(
    client: &GraphClient,
    p: DeleteContactParams,
) -> Result<Value, OutlookError> {
    let path = format!("{}/contacts/{}", user_path(p.user_id.as_deref()), p.contact_id);
    client
        .call_no_content(Method::DELETE, &path, GraphRequest::new())
        .await?;
    Ok(json!({"message": "Contact deleted successfully"}))
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateContactParams {
    pub contact_id: String,
    #[serde(flatten)]
    pub fields: ContactFields,
    /// Replaces all home phone numbers
    #[serde(rename = "homePhones")]
    pub home_phones: Option<Vec<String>>,
    pub user_id: Option<String>,
}

pub async fn update_contact(
    client: &GraphClient,
    p: UpdateContactParams,
) -> Result<Value, OutlookError> {
    let body = p.fields.into_body(p.home_phones);
    if body.is_empty() {
        return Err(OutlookError::Validation(
            "At least one contact field must be provided to update.".to_string(),
        ));
    }
    let path = format!("{}/contacts/{}", user_path(p.user_id.as_deref()), p.contact_id);
    client.patch(&path, Value::Object(body)).await
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateContactFolderParams {
    #[serde(rename = "displayName")]
    pub display_name: String,
    /// Parent contact folder; top level when absent
    #[serde(rename = "parentFolderId")]
    pub parent_folder_id: Option<String>,
    pub user_id: Option<String>,
}

pub async fn create_contact_folder(
    client: &GraphClient,
    p: CreateContactFolderParams,
) -> Result<Value, OutlookError> {
    let mut body = JsonObject::new();
    body.insert("displayName".into(), json!(p.display_name));
    put(&mut body, "parentFolderId", p.parent_folder_id);
    let path = format!("{}/contactFolders", user_path(p.user_id.as_deref()));
    client.post(&path, Value::Object(body)).await
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListContactsParams {
    /// Contact folder to list; the default folder when absent
    pub contact_folder_id: Option<String>,
    pub filter: Option<String>,
    pub orderby: Option<Vec<String>>,
    pub select: Option<Vec<String>>,
    pub top: Option<u32>,
    pub user_id: Option<String>,
}

pub async fn list_contacts(
    client: &GraphClient,
    p: ListContactsParams,
) -> Result<Value, OutlookError> {
    let query = Query::new()
        .text("$filter", p.filter.as_deref())
        .list("$orderby", p.orderby.as_deref())
        .list("$select", p.select.as_deref())
        .number("$top", p.top)
        .build();
    let user = user_path(p.user_id.as_deref());
    let path = match p.contact_folder_id.as_deref().filter(|f| !f.is_empty()) {
        Some(folder) => format!("{}/contactFolders/{}/contacts", user, folder),
        None => format!("{}/contacts", user),
    };
    client.get(&path, query).await
}
