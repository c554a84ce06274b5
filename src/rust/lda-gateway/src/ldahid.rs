// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Hardware backend binding the vendor's `libldahid` USB HID library.

use std::ffi::{CStr, c_char, c_int, c_uint};
use std::sync::{Mutex, MutexGuard, PoisonError};

use lda_units::Attenuation;

use crate::{DeviceGateway, DeviceId, Register, Result, Status};

const MAX_DEVICES: usize = 64;
const MAX_MODEL_NAME: usize = 32;

#[link(name = "ldahid")]
unsafe extern "C" {
    fn fnLDA_Init();
    fn fnLDA_SetTestMode(testmode: bool);
    fn fnLDA_GetNumDevices() -> c_int;
    fn fnLDA_GetDevInfo(active_devices: *mut c_uint) -> c_int;
    fn fnLDA_GetModelName(id: c_uint, model_name: *mut c_char) -> c_int;
    fn fnLDA_InitDevice(id: c_uint) -> c_int;
    fn fnLDA_CloseDevice(id: c_uint) -> c_int;
    fn fnLDA_GetSerialNumber(id: c_uint) -> c_int;
    fn fnLDA_LibVersion() -> *const c_char;
    fn fnLDA_SetAttenuation(id: c_uint, attenuation: c_int) -> c_int;
    fn fnLDA_GetAttenuation(id: c_uint) -> c_int;
    fn fnLDA_GetMinAttenuation(id: c_uint) -> c_int;
    fn fnLDA_GetMaxAttenuation(id: c_uint) -> c_int;
    fn fnLDA_GetDevResolution(id: c_uint) -> c_int;
    fn fnLDA_GetIdleTime(id: c_uint) -> c_int;
    fn fnLDA_GetDwellTime(id: c_uint) -> c_int;
    fn fnLDA_GetAttenuationStep(id: c_uint) -> c_int;
    fn fnLDA_GetRF_On(id: c_uint) -> c_int;
    fn fnLDA_GetRampStart(id: c_uint) -> c_int;
    fn fnLDA_GetRampEnd(id: c_uint) -> c_int;
}

unsafe extern "C" {
    fn geteuid() -> c_uint;
}

/// Whether the process has the privileges needed to open the USB HID devices.
pub fn running_as_root() -> bool {
    // SAFETY: `geteuid` has no preconditions and cannot fail.
    unsafe { geteuid() == 0 }
}

/// Interprets a library return value, which is either a value or an error status.
fn checked(code: c_int) -> Result<i32> {
    match Status::from_code(code as u32) {
        Some(status) => Err(status),
        None => Ok(code),
    }
}

/// Gateway to the attenuators attached over USB.
///
/// Calls into the library are serialized; the library keeps global device tables that are
/// not safe to mutate from several threads at once.
pub struct LdaHid {
    lock: Mutex<()>,
}

impl LdaHid {
    /// Initializes the library with test mode disabled.
    pub fn open() -> Self {
        // SAFETY: library initialization has no preconditions.
        unsafe {
            fnLDA_Init();
            fnLDA_SetTestMode(false);
        }
        lda_log::debug!("ldahid initialized");
        Self {
            lock: Mutex::new(()),
        }
    }

    fn call<T>(&self, f: impl FnOnce() -> T) -> T {
        let _guard: MutexGuard<'_, ()> = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        f()
    }

    fn read(&self, id: DeviceId, getter: unsafe extern "C" fn(c_uint) -> c_int) -> Result<i32> {
        // SAFETY: the getters only read the library's device table; unknown ids are
        // reported through the returned status.
        checked(self.call(|| unsafe { getter(id) }))
    }

    fn read_attenuation(
        &self,
        id: DeviceId,
        getter: unsafe extern "C" fn(c_uint) -> c_int,
    ) -> Result<Attenuation> {
        self.read(id, getter).map(Attenuation::from_raw)
    }
}

impl DeviceGateway for LdaHid {
    fn lib_version(&self) -> String {
        self.call(|| {
            // SAFETY: the library returns a pointer to a static, NUL-terminated string.
            let version = unsafe { fnLDA_LibVersion() };
            if version.is_null() {
                return String::new();
            }
            // SAFETY: non-null and NUL-terminated, see above.
            unsafe { CStr::from_ptr(version) }.to_string_lossy().into_owned()
        })
    }

    fn num_devices(&self) -> usize {
        // SAFETY: no preconditions.
        let count = self.call(|| unsafe { fnLDA_GetNumDevices() });
        usize::try_from(count).unwrap_or(0)
    }

    fn active_devices(&self) -> Vec<DeviceId> {
        let mut ids = [0 as c_uint; MAX_DEVICES];
        // SAFETY: the buffer holds MAXDEVICES entries, the most the library will write.
        let count = self.call(|| unsafe { fnLDA_GetDevInfo(ids.as_mut_ptr()) });
        let count = usize::try_from(count).unwrap_or(0).min(MAX_DEVICES);
        ids[..count].to_vec()
    }

    fn init_device(&self, id: DeviceId) -> Result<()> {
        // SAFETY: unknown ids are reported through the returned status.
        checked(self.call(|| unsafe { fnLDA_InitDevice(id) })).map(|_| ())
    }

    fn close_device(&self, id: DeviceId) -> Result<()> {
        // SAFETY: unknown ids are reported through the returned status.
        checked(self.call(|| unsafe { fnLDA_CloseDevice(id) })).map(|_| ())
    }

    fn serial_number(&self, id: DeviceId) -> Result<u32> {
        self.read(id, fnLDA_GetSerialNumber)
            .map(|serial| serial as u32)
    }

    fn model_name(&self, id: DeviceId) -> Result<String> {
        let mut buffer = [0 as c_char; MAX_MODEL_NAME + 1];
        // SAFETY: the buffer holds MAX_MODELNAME characters plus the terminator.
        checked(self.call(|| unsafe { fnLDA_GetModelName(id, buffer.as_mut_ptr()) }))?;
        // SAFETY: the library NUL-terminates the name and the buffer was zeroed.
        let name = unsafe { CStr::from_ptr(buffer.as_ptr()) };
        Ok(name.to_string_lossy().into_owned())
    }

    fn min_attenuation(&self, id: DeviceId) -> Result<Attenuation> {
        self.read_attenuation(id, fnLDA_GetMinAttenuation)
    }

    fn max_attenuation(&self, id: DeviceId) -> Result<Attenuation> {
        self.read_attenuation(id, fnLDA_GetMaxAttenuation)
    }

    fn resolution(&self, id: DeviceId) -> Result<Attenuation> {
        self.read_attenuation(id, fnLDA_GetDevResolution)
    }

    fn attenuation(&self, id: DeviceId) -> Result<Attenuation> {
        self.read_attenuation(id, fnLDA_GetAttenuation)
    }

    fn set_attenuation(&self, id: DeviceId, value: Attenuation) -> Result<()> {
        // SAFETY: out-of-range values and unknown ids are reported through the status.
        checked(self.call(|| unsafe { fnLDA_SetAttenuation(id, value.raw()) })).map(|_| ())
    }

    fn register(&self, id: DeviceId, register: Register) -> Result<i32> {
        let getter: unsafe extern "C" fn(c_uint) -> c_int = match register {
            Register::IdleTime => fnLDA_GetIdleTime,
            Register::DwellTime => fnLDA_GetDwellTime,
            Register::AttenuationStep => fnLDA_GetAttenuationStep,
            Register::RfOn => fnLDA_GetRF_On,
            Register::RampStart => fnLDA_GetRampStart,
            Register::RampEnd => fnLDA_GetRampEnd,
        };
        self.read(id, getter)
    }
}
