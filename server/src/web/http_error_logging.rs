use crate::web::orga::OrgaError;
use log::{error, warn};

pub async fn error_logging_middleware<B: actix_web::body::MessageBody>(
    req: actix_web::dev::ServiceRequest,
    next: actix_web::middleware::Next<B>,
) -> Result<actix_web::dev::ServiceResponse<B>, actix_web::Error> {
    let response = next.call(req).await?;

    let Some(error) = response.response().error() else {
        return Ok(response);
    };
    let client = response
        .request()
        .connection_info()
        .realip_remote_addr()
        .unwrap_or("unknown")
        .to_owned();
    if let Some(orga_error) = error.as_error::<OrgaError>() {
        match orga_error {
            OrgaError::PermissionDenied { required_privilege } => {
                warn!(
                    "HTTP {} permission denied at <{}>. Client: <{}> Requires: {}",
                    response.response().status(),
                    response.request().uri(),
                    client,
                    required_privilege
                        .map(|p| format!("{:?} privilege", p))
                        .unwrap_or("organizer permission".to_owned()),
                );
            }
            OrgaError::LoginFailed => {
                warn!(
                    "HTTP {} login failed. Client: <{}>",
                    response.response().status(),
                    client
                );
            }
            OrgaError::NotAuthenticated => {
                warn!(
                    "HTTP {} not authenticated at <{}>. Client: <{}>",
                    response.response().status(),
                    response.request().uri(),
                    client
                );
            }
            OrgaError::MissingMailTemplate => {
                warn!(
                    "HTTP {} missing mail template at <{}>",
                    response.response().status(),
                    response.request().uri()
                );
            }
            OrgaError::NotExisting
            | OrgaError::AlreadyExisting
            | OrgaError::InvalidJson(_)
            | OrgaError::InvalidData(_)
            | OrgaError::IllegalTransition { .. }
            | OrgaError::TransactionConflict
            | OrgaError::ConcurrentEditConflict => {}
            OrgaError::InternalError(e) => {
                error!(
                    "HTTP {} internal server error at <{}>: {}",
                    response.response().status(),
                    response.request().uri(),
                    e
                );
            }
        }
    } else if response.response().status().is_server_error() {
        error!(
            "HTTP {} unexpected error at <{}>: {:?}",
            response.response().status(),
            response.request().uri(),
            error
        );
    }
    Ok(response)
}
