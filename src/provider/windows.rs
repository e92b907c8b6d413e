//! Win32 SSPI provider
//!
//! Thin adapter over `secur32` through `windows-sys`. All calls block the
//! calling thread; the async boundary runs them on blocking workers.

#![allow(unsafe_code)]

use super::{
    ContextRequest, ContextStep, PackageInfo, ProviderError, ProviderResult, RawHandle,
    SecurityProvider,
};
use crate::error::is_error_code;
use crate::logging::trace_entry;
use std::ffi::c_void;
use std::iter;
use std::ptr;
use windows_sys::Win32::Security::Authentication::Identity::{
    AcquireCredentialsHandleW, CompleteAuthToken, DeleteSecurityContext,
    EnumerateSecurityPackagesW, FreeContextBuffer, FreeCredentialsHandle,
    InitializeSecurityContextW, SecBuffer, SecBufferDesc, SecPkgInfoW, SECBUFFER_TOKEN,
    SECBUFFER_VERSION, SECPKG_CRED_OUTBOUND, SECURITY_NATIVE_DREP,
};
use windows_sys::Win32::Security::Credentials::SecHandle;

const SEC_E_OK: i32 = 0;
const SEC_E_INVALID_TOKEN: u32 = 0x80090308;

/// SSPI provider for the logged-in Windows user
#[derive(Debug, Default)]
pub struct WindowsSspi;

impl WindowsSspi {
    pub fn new() -> Self {
        Self
    }
}

fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(iter::once(0)).collect()
}

fn to_sec_handle(raw: RawHandle) -> SecHandle {
    SecHandle {
        dwLower: raw.lower,
        dwUpper: raw.upper,
    }
}

fn from_sec_handle(handle: &SecHandle) -> RawHandle {
    RawHandle::new(handle.dwLower, handle.dwUpper)
}

/// Read a NUL-terminated UTF-16 string owned by the provider
///
/// # Safety
/// `ptr` must be null or point at a NUL-terminated UTF-16 string.
unsafe fn wide_to_string(ptr: *const u16) -> String {
    if ptr.is_null() {
        return String::new();
    }
    let mut len = 0;
    while *ptr.add(len) != 0 {
        len += 1;
    }
    String::from_utf16_lossy(std::slice::from_raw_parts(ptr, len))
}

fn check(operation: &str, status: i32) -> ProviderResult<()> {
    if status == SEC_E_OK {
        Ok(())
    } else {
        Err(ProviderError::from_status(operation, status as u32))
    }
}

impl SecurityProvider for WindowsSspi {
    fn enumerate_packages(&self) -> ProviderResult<Vec<PackageInfo>> {
        trace_entry("WindowsSspi::enumerate_packages");

        let mut count: u32 = 0;
        let mut infos: *mut SecPkgInfoW = ptr::null_mut();
        let status = unsafe { EnumerateSecurityPackagesW(&mut count, &mut infos) };
        check("EnumerateSecurityPackagesW", status)?;

        let packages = if infos.is_null() {
            Vec::new()
        } else {
            unsafe { std::slice::from_raw_parts(infos, count as usize) }
                .iter()
                .map(|info| PackageInfo {
                    name: unsafe { wide_to_string(info.Name) },
                    max_token_size: info.cbMaxToken,
                })
                .collect()
        };

        if !infos.is_null() {
            let status = unsafe { FreeContextBuffer(infos as *mut c_void) };
            check("FreeContextBuffer", status)?;
        }

        Ok(packages)
    }

    fn acquire_credential(&self, package: &str) -> ProviderResult<RawHandle> {
        trace_entry("WindowsSspi::acquire_credential");

        let package = to_wide(package);
        let mut handle = SecHandle {
            dwLower: 0,
            dwUpper: 0,
        };
        let mut expiry: i64 = 0;

        let status = unsafe {
            AcquireCredentialsHandleW(
                ptr::null(),
                package.as_ptr(),
                SECPKG_CRED_OUTBOUND,
                ptr::null(),
                ptr::null(),
                None,
                ptr::null(),
                &mut handle,
                &mut expiry,
            )
        };
        check("AcquireCredentialsHandleW", status)?;

        Ok(from_sec_handle(&handle))
    }

    fn initialize_context(&self, request: ContextRequest<'_>) -> ProviderResult<ContextStep> {
        trace_entry("WindowsSspi::initialize_context");

        let target = to_wide(request.target_name);
        let credential = to_sec_handle(request.credential);
        let existing = request.context.map(to_sec_handle);
        let mut new_context = existing.unwrap_or(SecHandle {
            dwLower: 0,
            dwUpper: 0,
        });

        let mut input = request.input.to_vec();
        let mut in_buffer = SecBuffer {
            cbBuffer: input.len() as u32,
            BufferType: SECBUFFER_TOKEN,
            pvBuffer: input.as_mut_ptr() as *mut c_void,
        };
        let in_desc = SecBufferDesc {
            ulVersion: SECBUFFER_VERSION,
            cBuffers: 1,
            pBuffers: &mut in_buffer,
        };

        let mut output = vec![0u8; request.output_capacity];
        let mut out_buffer = SecBuffer {
            cbBuffer: output.len() as u32,
            BufferType: SECBUFFER_TOKEN,
            pvBuffer: output.as_mut_ptr() as *mut c_void,
        };
        let mut out_desc = SecBufferDesc {
            ulVersion: SECBUFFER_VERSION,
            cBuffers: 1,
            pBuffers: &mut out_buffer,
        };

        let mut attributes: u32 = 0;
        let mut expiry: i64 = 0;

        // The server's token is only meaningful once a context exists.
        let status = unsafe {
            InitializeSecurityContextW(
                &credential,
                existing
                    .as_ref()
                    .map_or(ptr::null(), |handle| handle as *const SecHandle),
                target.as_ptr(),
                request.requirements.bits(),
                0,
                SECURITY_NATIVE_DREP,
                if existing.is_some() {
                    &in_desc as *const SecBufferDesc
                } else {
                    ptr::null()
                },
                0,
                &mut new_context,
                &mut out_desc,
                &mut attributes,
                &mut expiry,
            )
        } as u32;

        if is_error_code(status) {
            return Err(ProviderError::from_status(
                "InitializeSecurityContextW",
                status,
            ));
        }

        let written = out_buffer.cbBuffer as usize;
        if written > output.len() {
            return Err(ProviderError::new(
                SEC_E_INVALID_TOKEN,
                "InitializeSecurityContextW reported more bytes than the output buffer holds.",
            ));
        }
        output.truncate(written);

        Ok(ContextStep {
            status,
            context: from_sec_handle(&new_context),
            token: output,
        })
    }

    fn complete_token(&self, context: RawHandle, token: &mut Vec<u8>) -> ProviderResult<()> {
        trace_entry("WindowsSspi::complete_token");

        let context = to_sec_handle(context);
        let mut buffer = SecBuffer {
            cbBuffer: token.len() as u32,
            BufferType: SECBUFFER_TOKEN,
            pvBuffer: token.as_mut_ptr() as *mut c_void,
        };
        let desc = SecBufferDesc {
            ulVersion: SECBUFFER_VERSION,
            cBuffers: 1,
            pBuffers: &mut buffer,
        };

        let status = unsafe { CompleteAuthToken(&context, &desc) };
        check("CompleteAuthToken", status)?;

        token.truncate(buffer.cbBuffer as usize);
        Ok(())
    }

    fn delete_context(&self, context: RawHandle) -> ProviderResult<()> {
        trace_entry("WindowsSspi::delete_context");
        let context = to_sec_handle(context);
        let status = unsafe { DeleteSecurityContext(&context) };
        check("DeleteSecurityContext", status)
    }

    fn delete_credential(&self, credential: RawHandle) -> ProviderResult<()> {
        trace_entry("WindowsSspi::delete_credential");
        let credential = to_sec_handle(credential);
        let status = unsafe { FreeCredentialsHandle(&credential) };
        check("FreeCredentialsHandle", status)
    }
}
