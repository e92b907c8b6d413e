//! Handshake scenarios driven directly through `AuthSession`

use super::mock_provider::{
    complete, continue_needed, with_status, Release, CONTEXT_HANDLE, CREDENTIAL_HANDLE,
};
use super::test_context::TEST_SPN;
use super::{ScriptedProvider, TestContext};
use crate::auth::canned::{CANNED_WITHOUT_INPUT_MESSAGE, CANNED_WITH_INPUT_MESSAGE};
use crate::auth::{SecurityPackage, SessionState};
use crate::error::SecurityStatus;
use crate::provider::{ContextRequirements, PackageInfo, ProviderError};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_round_handshake() {
        let provider = ScriptedProvider::new().with_steps([
            continue_needed(b"negotiate"),
            continue_needed(b"authenticate"),
            complete(b"final"),
        ]);
        let (ctx, _) = TestContext::initialized(provider);
        let mut session = ctx.session(None);

        let first = session.step(&[]);
        assert!(!first.is_error());
        assert_eq!(first.token.as_bytes(), b"negotiate");
        assert!(!first.done);
        assert_eq!(first.status, 0x00090312);
        assert_eq!(session.state(), SessionState::InProgress);

        let second = session.step(b"challenge");
        assert_eq!(second.token.as_bytes(), b"authenticate");
        assert!(!second.done);

        let third = session.step(b"accept");
        assert_eq!(third.token.as_bytes(), b"final");
        assert!(third.done);
        assert_eq!(third.status, 0);
        assert!(third.error_message.is_empty());
        assert_eq!(session.state(), SessionState::Complete);

        let requests = ctx.provider.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].context, None);
        assert!(requests[0].input.is_empty());
        assert_eq!(requests[1].context, Some(CONTEXT_HANDLE));
        assert_eq!(requests[1].input, b"challenge");
        assert_eq!(requests[2].context, Some(CONTEXT_HANDLE));
        assert_eq!(requests[2].input, b"accept");
        for request in &requests {
            assert_eq!(request.credential, CREDENTIAL_HANDLE);
            assert_eq!(request.target_name, TEST_SPN);
            assert_eq!(request.output_capacity, 48256);
            assert_eq!(request.requirements, ContextRequirements::default());
        }

        assert_eq!(ctx.provider.acquire_count(), 1);
        assert_eq!(ctx.provider.acquired(), vec!["Negotiate"]);
    }

    #[test]
    fn test_first_round_ignores_input() {
        let provider = ScriptedProvider::new().with_steps([continue_needed(b"t1")]);
        let (ctx, _) = TestContext::initialized(provider);
        let mut session = ctx.session(None);

        session.step(b"stale server token");
        assert!(ctx.provider.requests()[0].input.is_empty());
    }

    #[test]
    fn test_explicit_package_overrides_default() {
        let provider = ScriptedProvider::new().with_steps([complete(b"t")]);
        let (ctx, _) = TestContext::initialized(provider);
        let mut session = ctx.session(Some(SecurityPackage::Kerberos));

        let result = session.step(&[]);
        assert!(result.done);
        assert_eq!(ctx.provider.acquired(), vec!["Kerberos"]);
    }

    #[test]
    fn test_no_provider_call_before_first_step() {
        let (ctx, _) = TestContext::initialized(ScriptedProvider::new());
        let session = ctx.session(None);

        assert_eq!(session.state(), SessionState::Fresh);
        assert!(!session.has_credential());
        assert!(!session.has_context());
        drop(session);

        assert_eq!(ctx.provider.acquire_count(), 0);
        assert!(ctx.provider.releases().is_empty());
    }

    #[test]
    fn test_credential_failure_is_retryable() {
        let provider = ScriptedProvider::new()
            .with_credential_failures(&[SecurityStatus::NoCredentials.code()])
            .with_steps([complete(b"t")]);
        let (ctx, _) = TestContext::initialized(provider);
        let mut session = ctx.session(None);

        let failed = session.step(&[]);
        assert!(failed.is_error());
        assert_eq!(failed.status, 0x8009030E);
        assert_eq!(
            failed.error_message,
            "AcquireCredentialsHandle failed with error code: 0x8009030E."
        );
        assert!(failed.token.is_empty());
        assert_eq!(session.state(), SessionState::Fresh);
        assert!(!session.has_credential());
        assert_eq!(ctx.provider.initialize_count(), 0);

        let retried = session.step(&[]);
        assert!(!retried.is_error());
        assert!(retried.done);
        assert_eq!(ctx.provider.acquire_count(), 2);
        assert_eq!(session.state(), SessionState::Complete);
    }

    #[test]
    fn test_rejected_status_is_sticky() {
        let provider = ScriptedProvider::new().with_steps([
            continue_needed(b"t1"),
            with_status(SecurityStatus::LogonDenied, b""),
            complete(b"never"),
        ]);
        let (ctx, _) = TestContext::initialized(provider);
        let mut session = ctx.session(None);

        session.step(&[]);
        let failed = session.step(b"challenge");
        assert_eq!(failed.status, 0x8009030C);
        assert_eq!(
            failed.error_message,
            "InitializeSecurityContext failed with error code: 0x8009030C."
        );
        assert_eq!(session.state(), SessionState::Failed);

        let again = session.step(b"challenge");
        assert_eq!(again.status, failed.status);
        assert_eq!(again.error_message, failed.error_message);
        assert!(!again.done);
        assert_eq!(ctx.provider.initialize_count(), 2);
    }

    #[test]
    fn test_provider_error_is_sticky() {
        let provider = ScriptedProvider::new().with_steps([Err(ProviderError::from_status(
            "InitializeSecurityContextW",
            SecurityStatus::TargetUnknown.code(),
        ))]);
        let (ctx, _) = TestContext::initialized(provider);
        let mut session = ctx.session(None);

        let failed = session.step(&[]);
        assert_eq!(failed.status, 0x80090303);
        assert_eq!(
            failed.error_message,
            "InitializeSecurityContextW failed with error code: 0x80090303."
        );
        assert!(!session.has_context());

        session.step(&[]);
        assert_eq!(ctx.provider.initialize_count(), 1);

        drop(session);
        assert_eq!(
            ctx.provider.releases(),
            vec![Release::Credential(CREDENTIAL_HANDLE)]
        );
    }

    #[test]
    fn test_unknown_status_is_fatal() {
        let provider = ScriptedProvider::new().with_steps([Ok((0x00090317, Vec::new()))]);
        let (ctx, _) = TestContext::initialized(provider);
        let mut session = ctx.session(None);

        let failed = session.step(&[]);
        assert_eq!(failed.status, 0x00090317);
        assert!(failed.is_error());
        assert_eq!(session.state(), SessionState::Failed);
    }

    #[test]
    fn test_rejected_first_round_releases_context() {
        // SEC_I_INCOMPLETE_CREDENTIALS: informational, but not a handshake status
        let provider = ScriptedProvider::new().with_steps([Ok((0x00090320, b"t".to_vec()))]);
        let (ctx, _) = TestContext::initialized(provider);
        let mut session = ctx.session(None);

        let failed = session.step(&[]);
        assert_eq!(failed.status, 0x00090320);
        assert_eq!(
            failed.error_message,
            "InitializeSecurityContext failed with error code: 0x90320."
        );
        assert_eq!(session.state(), SessionState::Failed);
        assert!(session.has_context());

        drop(session);
        assert_eq!(
            ctx.provider.releases(),
            vec![
                Release::Context(CONTEXT_HANDLE),
                Release::Credential(CREDENTIAL_HANDLE)
            ]
        );
    }

    #[test]
    fn test_teardown_failures_are_swallowed() {
        let provider = ScriptedProvider::new()
            .with_steps([continue_needed(b"t1")])
            .with_teardown_failure(SecurityStatus::InvalidHandle.code());
        let (ctx, _) = TestContext::initialized(provider);
        let mut session = ctx.session(None);

        let result = session.step(&[]);
        drop(session);

        assert!(!result.is_error());
        assert_eq!(result.status, 0x00090312);
        assert_eq!(result.token.as_bytes(), b"t1");
        assert!(!result.done);
        assert_eq!(
            ctx.provider.releases(),
            vec![
                Release::Context(CONTEXT_HANDLE),
                Release::Credential(CREDENTIAL_HANDLE)
            ]
        );
    }

    #[test]
    fn test_step_after_complete_is_out_of_sequence() {
        let provider = ScriptedProvider::new().with_steps([complete(b"t")]);
        let (ctx, _) = TestContext::initialized(provider);
        let mut session = ctx.session(None);

        assert!(session.step(&[]).done);
        let late = session.step(b"extra");
        assert_eq!(late.status, SecurityStatus::OutOfSequence.code());
        assert_eq!(late.error_message, "Security context is already established.");
        assert_eq!(ctx.provider.initialize_count(), 1);
        assert_eq!(session.state(), SessionState::Complete);
    }

    #[test]
    fn test_forced_completion_runs_every_round() {
        let provider = ScriptedProvider::new().with_steps([
            continue_needed(b"t1"),
            continue_needed(b"t2"),
            complete(b"t3"),
        ]);
        let (ctx, _) = TestContext::initialized(provider);
        let mut session = ctx.session(None);
        session.force_complete_auth(true);

        session.step(&[]);
        session.step(b"s1");
        let last = session.step(b"s2");

        assert!(last.done);
        assert_eq!(ctx.provider.complete_count(), 3);
    }

    #[test]
    fn test_completion_follows_status() {
        let provider = ScriptedProvider::new().with_steps([
            continue_needed(b"t1"),
            with_status(SecurityStatus::CompleteAndContinue, b"t2"),
            with_status(SecurityStatus::CompleteNeeded, b"t3"),
        ]);
        let (ctx, _) = TestContext::initialized(provider);
        let mut session = ctx.session(None);

        assert!(!session.step(&[]).done);
        assert_eq!(ctx.provider.complete_count(), 0);

        assert!(!session.step(b"s1").done);
        assert_eq!(ctx.provider.complete_count(), 1);

        let last = session.step(b"s2");
        assert!(last.done);
        assert_eq!(last.status, 0x00090313);
        assert_eq!(ctx.provider.complete_count(), 2);
    }

    #[test]
    fn test_completion_failure_is_fatal() {
        let provider = ScriptedProvider::new()
            .with_steps([with_status(SecurityStatus::CompleteNeeded, b"t")])
            .with_complete_failure(SecurityStatus::InvalidToken.code());
        let (ctx, _) = TestContext::initialized(provider);
        let mut session = ctx.session(None);

        let failed = session.step(&[]);
        assert_eq!(failed.status, 0x80090308);
        assert_eq!(
            failed.error_message,
            "CompleteAuthToken failed with error code: 0x80090308."
        );
        assert_eq!(session.state(), SessionState::Failed);
    }

    #[test]
    fn test_oversized_token_is_fatal() {
        let provider = ScriptedProvider::new()
            .with_packages(vec![PackageInfo::new("NTLM", 4)])
            .with_steps([continue_needed(b"too long")]);
        let (ctx, _) = TestContext::initialized(provider);
        let mut session = ctx.session(None);

        let failed = session.step(&[]);
        assert_eq!(failed.status, SecurityStatus::BufferTooSmall.code());
        assert!(failed.token.is_empty());
        assert_eq!(session.state(), SessionState::Failed);
    }

    #[test]
    fn test_teardown_order() {
        let provider = ScriptedProvider::new()
            .with_steps([continue_needed(b"t1"), continue_needed(b"t2")]);
        let (ctx, _) = TestContext::initialized(provider);
        let mut session = ctx.session(None);

        session.step(&[]);
        session.step(b"s1");
        assert!(session.has_context());
        drop(session);

        assert_eq!(
            ctx.provider.releases(),
            vec![
                Release::Context(CONTEXT_HANDLE),
                Release::Credential(CREDENTIAL_HANDLE)
            ]
        );
    }

    #[test]
    fn test_uninitialized_catalog_fails_without_provider_calls() {
        let ctx = TestContext::new(ScriptedProvider::new());
        let mut session = ctx.session(None);

        let failed = session.step(&[]);
        assert_eq!(failed.status, SecurityStatus::PackageNotFound.code());
        assert_eq!(session.state(), SessionState::Failed);
        assert_eq!(ctx.provider.acquire_count(), 0);
    }

    #[test]
    fn test_custom_requirements_reach_provider() {
        let provider = ScriptedProvider::new().with_steps([complete(b"t")]);
        let (ctx, _) = TestContext::initialized(provider);
        let requirements = ContextRequirements::MUTUAL_AUTH | ContextRequirements::CONFIDENTIALITY;
        let mut session = ctx.session(None).with_requirements(requirements);

        session.step(&[]);
        assert_eq!(ctx.provider.requests()[0].requirements, requirements);
    }

    #[test]
    fn test_canned_empty_input() {
        let (ctx, _) = TestContext::initialized(ScriptedProvider::new());
        let mut session = ctx.session(None);
        session.enable_canned_response(true);

        let result = session.step(&[]);
        let expected: Vec<u8> = (0..25).collect();
        assert_eq!(result.token.as_bytes(), &expected[..]);
        assert!(result.done);
        assert_eq!(result.status, 0x80090304);
        assert_eq!(result.error_message, CANNED_WITHOUT_INPUT_MESSAGE);

        drop(session);
        assert_eq!(ctx.provider.acquire_count(), 0);
        assert_eq!(ctx.provider.initialize_count(), 0);
        assert!(ctx.provider.releases().is_empty());
    }

    #[test]
    fn test_canned_echo() {
        let ctx = TestContext::new(ScriptedProvider::new());
        let mut session = ctx.session(None);
        session.enable_canned_response(true);

        let input: Vec<u8> = (0..=255).collect();
        let result = session.step(&input);
        assert_eq!(result.token.as_bytes(), &input[..]);
        assert!(!result.done);
        assert_eq!(result.status, 0x80090303);
        assert_eq!(result.error_message, CANNED_WITH_INPUT_MESSAGE);
        assert_eq!(session.state(), SessionState::Fresh);
    }

    #[test]
    fn test_canned_toggle_takes_effect_next_step() {
        let provider = ScriptedProvider::new().with_steps([continue_needed(b"real")]);
        let (ctx, _) = TestContext::initialized(provider);
        let mut session = ctx.session(None);

        session.enable_canned_response(true);
        assert_eq!(session.step(&[]).token.len(), 25);

        session.enable_canned_response(false);
        assert_eq!(session.step(&[]).token.as_bytes(), b"real");
        assert_eq!(ctx.provider.initialize_count(), 1);
    }
}
