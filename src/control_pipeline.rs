//! Request-control authorization/dispatch and response-control construction
//! (spec.md §4.3).
//!
//! Wire decoding of a control's opaque payload - the actual ASN.1/BER work -
//! is "the control codec", explicitly out of scope (spec.md §1); it is
//! modeled here as the `ControlCodec` collaborator trait, the same way the
//! schema validator and access-control decision logic are modeled as traits
//! elsewhere in this crate.
//!
//! spec.md §4.3.1 requires decoded forms to be "substituted back into the
//! request-controls list so subsequent extensions see typed objects".
//! `event.request_controls` is immutable request data shared by reference
//! elsewhere, so rather than rewrite it in place this pipeline appends each
//! decoded control to `ctx.decoded_controls` in request order as it goes;
//! that field is the substituted list extensions must read, documented at
//! its declaration on `OperationContext`.

use crate::access::AccessControlHandler;
use crate::backend::Backend;
use crate::control::{oid, ClientControl, Control, ReadEntryInclusionPolicy, ReadEntryResponse, ResponseControl};
use crate::context::OperationContext;
use crate::dn::Dn;
use crate::entry::{Entry, EntryInvalid};
use crate::error::OperationError;
use crate::filter::Filter;
use crate::identity::Privilege;

/// Decodes a request control's opaque payload into the typed form the
/// pipeline dispatches on.
pub trait ControlCodec: Send + Sync {
    fn decode_assertion_filter(&self, payload: &[u8]) -> Result<Filter, OperationError>;
    fn decode_read_entry_inclusion_policy(&self, payload: &[u8]) -> Result<ReadEntryInclusionPolicy, OperationError>;
    fn decode_proxied_authorization_dn(&self, payload: &[u8]) -> Result<Option<Dn>, OperationError>;
}

fn decode(codec: &dyn ControlCodec, control: &Control) -> Result<ClientControl, OperationError> {
    match control.oid.as_str() {
        oid::LDAP_ASSERTION => {
            let filter = codec.decode_assertion_filter(&control.payload).map_err(|_| {
                OperationError::ProtocolError(format!("malformed {} control payload", oid::LDAP_ASSERTION))
            })?;
            Ok(ClientControl::Assertion(filter))
        }
        oid::LDAP_NOOP_OPENLDAP_ASSIGNED => Ok(ClientControl::NoOp),
        oid::LDAP_READENTRY_PREREAD => Ok(ClientControl::PreRead(
            codec.decode_read_entry_inclusion_policy(&control.payload)?,
        )),
        oid::LDAP_READENTRY_POSTREAD => Ok(ClientControl::PostRead(
            codec.decode_read_entry_inclusion_policy(&control.payload)?,
        )),
        oid::PROXIED_AUTH_V1 => Ok(ClientControl::ProxiedAuthV1(
            codec.decode_proxied_authorization_dn(&control.payload)?,
        )),
        oid::PROXIED_AUTH_V2 => Ok(ClientControl::ProxiedAuthV2(
            codec.decode_proxied_authorization_dn(&control.payload)?,
        )),
        other => Ok(ClientControl::Unknown {
            oid: other.to_string(),
            critical: control.critical,
            payload: control.payload.clone(),
        }),
    }
}

/// spec.md §4.3.1: iterates the client-provided request controls in order,
/// authorizing and dispatching each by OID. Mutates `ctx` in place
/// (`no_op`, `pre_read_policy`, `post_read_policy`, `proxied_authorization_dn`,
/// `authorization_entry`, `decoded_controls`).
pub fn process_request_controls(
    ctx: &mut OperationContext,
    current_entry: &Entry<EntryInvalid>,
    access: &dyn AccessControlHandler,
    codec: &dyn ControlCodec,
    backend: &dyn Backend,
) -> Result<(), OperationError> {
    let raw_controls = ctx.event.request_controls.clone();
    for raw in &raw_controls {
        let decoded = decode(codec, raw)?;

        let allowed = access
            .is_allowed_control(&ctx.event.entry_dn, &ctx.event, &decoded)
            .map_err(|e| {
                ctx.skip_post_operation = true;
                e
            })?;
        if !allowed {
            ctx.skip_post_operation = true;
            crate::security_access!(oid = decoded.oid(), dn = %ctx.event.entry_dn, "control denied by access control");
            return Err(OperationError::InsufficientAccessRights(format!(
                "not permitted to use control {}",
                decoded.oid()
            )));
        }

        match &decoded {
            ClientControl::Assertion(filter) => {
                if !filter.evaluate(current_entry) {
                    return Err(OperationError::AssertionFailed);
                }
            }
            ClientControl::NoOp => {
                ctx.no_op = true;
            }
            ClientControl::PreRead(policy) => {
                ctx.pre_read_policy = Some(*policy);
            }
            ClientControl::PostRead(policy) => {
                ctx.post_read_policy = Some(*policy);
            }
            ClientControl::ProxiedAuthV1(dn) | ClientControl::ProxiedAuthV2(dn) => {
                if !ctx.event.ident.has_privilege(Privilege::ProxiedAuth) {
                    return Err(OperationError::AuthorizationDenied(
                        "caller lacks the PROXIED_AUTH privilege".to_string(),
                    ));
                }
                match dn {
                    Some(target) => {
                        let entry = backend.get_entry(target).map_err(|_| {
                            OperationError::AuthorizationDenied(format!("no such authorization entry {target}"))
                        })?;
                        ctx.authorization_entry = Some(entry);
                        ctx.proxied_authorization_dn = Some(target.clone());
                    }
                    None => {
                        ctx.authorization_entry = None;
                        ctx.proxied_authorization_dn = Some(Dn::null());
                    }
                }
                crate::security_info!(dn = ?ctx.proxied_authorization_dn, "proxied authorization applied");
            }
            ClientControl::Unknown { oid, critical, .. } => {
                if *critical && !backend.supports_control(oid) {
                    return Err(OperationError::UnavailableCriticalExtension(format!(
                        "backend does not support critical control {oid}"
                    )));
                }
            }
        }

        ctx.decoded_controls.push(decoded);
    }
    Ok(())
}

fn filter_entry(entry: &Entry<EntryInvalid>, policy: ReadEntryInclusionPolicy) -> Entry<EntryInvalid> {
    let mut attrs = Vec::new();
    for a in entry.user_attributes() {
        let is_object_class = a.attribute_type.normalized() == "objectclass";
        if is_object_class {
            if policy.object_class {
                attrs.push(a.clone());
            }
        } else if policy.user_attributes {
            attrs.push(a.clone());
        }
    }
    if policy.operational_attributes {
        attrs.extend(entry.operational_attributes().cloned());
    }
    crate::entry::Entry::new(entry.dn().clone(), attrs).into_invalid()
}

/// spec.md §4.3.2: builds `LDAP_PREREAD_RESPONSE`/`LDAP_POSTREAD_RESPONSE`
/// response controls from the requested policies and the corresponding
/// entry snapshot, appending them to `ctx.response_controls`.
pub fn attach_read_entry_controls(
    ctx: &mut OperationContext,
    current_entry: Option<&Entry<EntryInvalid>>,
    new_entry: Option<&Entry<EntryInvalid>>,
) {
    if let (Some(policy), Some(entry)) = (ctx.pre_read_policy, current_entry) {
        ctx.response_controls.push(ResponseControl::PreRead(ReadEntryResponse {
            entry: filter_entry(entry, policy),
        }));
    }
    if let (Some(policy), Some(entry)) = (ctx.post_read_policy, new_entry) {
        ctx.response_controls.push(ResponseControl::PostRead(ReadEntryResponse {
            entry: filter_entry(entry, policy),
        }));
    }
}
