//! Pre-parsed descriptor acquisition with guaranteed release

use std::ops::Deref;

use crate::error::HidError;
use crate::types::DeviceHandle;

/// Hands out a device's pre-parsed report descriptor.
///
/// Every descriptor returned by `acquire` must be passed back to `release`
/// exactly once. The decoder does this through [`DescriptorGuard`].
pub trait DescriptorProvider {
    type Descriptor;

    fn acquire(&self, device: DeviceHandle) -> Result<Self::Descriptor, HidError>;

    fn release(&self, descriptor: Self::Descriptor);
}

/// Owns an acquired descriptor and releases it on drop
pub struct DescriptorGuard<'p, P: DescriptorProvider + ?Sized> {
    provider: &'p P,
    descriptor: Option<P::Descriptor>,
}

impl<'p, P: DescriptorProvider + ?Sized> DescriptorGuard<'p, P> {
    pub fn acquire(provider: &'p P, device: DeviceHandle) -> Result<Self, HidError> {
        let descriptor = provider.acquire(device)?;
        Ok(Self {
            provider,
            descriptor: Some(descriptor),
        })
    }
}

impl<P: DescriptorProvider + ?Sized> Deref for DescriptorGuard<'_, P> {
    type Target = P::Descriptor;

    fn deref(&self) -> &Self::Target {
        // Only `drop` takes the descriptor out
        match self.descriptor.as_ref() {
            Some(d) => d,
            None => unreachable!("descriptor already released"),
        }
    }
}

impl<P: DescriptorProvider + ?Sized> Drop for DescriptorGuard<'_, P> {
    fn drop(&mut self) {
        if let Some(descriptor) = self.descriptor.take() {
            self.provider.release(descriptor);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Default)]
    struct Counting {
        acquired: Cell<u32>,
        released: Cell<u32>,
        fail: bool,
    }

    impl DescriptorProvider for Counting {
        type Descriptor = u64;

        fn acquire(&self, device: DeviceHandle) -> Result<u64, HidError> {
            if self.fail {
                return Err(HidError::unavailable("descriptor", "no preparsed data"));
            }
            self.acquired.set(self.acquired.get() + 1);
            Ok(device.0 * 10)
        }

        fn release(&self, _descriptor: u64) {
            self.released.set(self.released.get() + 1);
        }
    }

    #[test]
    fn test_release_on_drop() {
        let provider = Counting::default();
        {
            let guard = DescriptorGuard::acquire(&provider, DeviceHandle(4)).unwrap();
            assert_eq!(*guard, 40);
            assert_eq!(provider.released.get(), 0);
        }
        assert_eq!(provider.acquired.get(), 1);
        assert_eq!(provider.released.get(), 1);
    }

    #[test]
    fn test_failed_acquire_releases_nothing() {
        let provider = Counting {
            fail: true,
            ..Default::default()
        };
        assert!(DescriptorGuard::acquire(&provider, DeviceHandle(1)).is_err());
        assert_eq!(provider.released.get(), 0);
    }
}
