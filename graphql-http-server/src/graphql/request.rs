use crate::context::UploadedFile;
use crate::json_ext::Object;

/// A GraphQL `Request` as decoded from any of the supported transport encodings.
///
/// Built once per HTTP call and consumed by the dispatcher.
#[derive(Clone, Debug, Default, PartialEq)]
#[non_exhaustive]
pub struct Request {
    /// The GraphQL operation (e.g., query, mutation) string.
    ///
    /// Only a JSON body can leave this out; every other encoding rejects the
    /// request before it gets this far.
    pub query: Option<String>,

    /// The (optional) GraphQL operation name.
    ///
    /// When specified, this name must match the name of an operation in the
    /// GraphQL document.  When excluded, there must exist only a single
    /// operation in the GraphQL document.
    pub operation_name: Option<String>,

    /// The (optional) GraphQL variables in the form of a JSON object.
    ///
    /// `None` and an empty object are different: absent variables are never
    /// handed to the engine.
    pub variables: Option<Object>,

    /// The file sent with a multipart request.
    pub upload: Option<UploadedFile>,
}

#[buildstructor::buildstructor]
impl Request {
    /// This is the constructor (or builder) to use when constructing a GraphQL
    /// `Request`.
    #[builder(visibility = "pub")]
    fn new(
        query: Option<String>,
        operation_name: Option<String>,
        variables: Option<Object>,
        upload: Option<UploadedFile>,
    ) -> Self {
        Self {
            query,
            operation_name,
            variables,
            upload,
        }
    }

    /// The operation name, if one was given that is not blank.
    pub fn non_blank_operation_name(&self) -> Option<&str> {
        self.operation_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
    }
}
