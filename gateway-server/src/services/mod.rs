//! Services for the Gateway Server
//!
//! Request authentication, session tokens, proof tokens and payments.

pub mod accounts;
pub mod authenticator;
pub mod canonical;
pub mod payment;
pub mod proof_token;
pub mod session;
pub mod signing;

pub use accounts::AccountService;
pub use authenticator::{PartnerContext, RequestAuthenticator, RequestHeaders, SignedRequest};
pub use canonical::CanonicalRequestSigner;
pub use payment::{CustomerRef, IdentitySource, PaymentAuthorizer, PaymentOrder};
pub use proof_token::{AlgorithmDescriptor, ProofTokenProtocol, Redemption};
pub use session::{AccessClaims, SessionTokenIssuer};
pub use signing::{RequestSigner, SigningHelper};
