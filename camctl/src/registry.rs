//! Camera registry
//!
//! Built once at startup: enumerate, hash identities, open handles. The
//! identity set never changes afterwards.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use camctl_core::{CameraDescriptor, CameraIdentity, IdentityHasher, ResultCode, Target};

use crate::camera::CameraHandle;
use crate::error::{Error, Result};
use crate::sdk::{CameraSdk, DigitalOutput};

/// Registered cameras, keyed by identity
#[derive(Debug, Default)]
pub struct Registry {
    /// Enumerated identities, in enumeration order
    order: Vec<CameraIdentity>,
    descriptors: HashMap<CameraIdentity, CameraDescriptor>,
    /// Enumerated cameras whose session could not be opened
    unavailable: HashSet<CameraIdentity>,
    handles: BTreeMap<CameraIdentity, CameraHandle>,
}

impl Registry {
    /// Enumerate cameras and open them
    ///
    /// With `filter`, only the camera whose id string matches is opened.
    ///
    /// # Errors
    ///
    /// - [`Error::Enumeration`] if the SDK cannot list cameras
    /// - [`Error::NoCameras`] if none are connected
    /// - [`Error::IdentityCollision`] if two id strings hash alike
    /// - [`Error::CameraNotFound`] if `filter` names no enumerated camera
    /// - [`Error::NoCamerasOpened`] if every open failed
    pub fn build(
        sdk: &dyn CameraSdk,
        hasher: &IdentityHasher,
        filter: Option<&str>,
        output: Option<Arc<dyn DigitalOutput>>,
    ) -> Result<Self> {
        let cameras = sdk.list_cameras().map_err(Error::Enumeration)?;
        if cameras.is_empty() {
            return Err(Error::NoCameras);
        }
        info!("Found {} camera(s)", cameras.len());

        let mut registry = Self::default();
        for descriptor in cameras {
            let identity = hasher.hash(&descriptor.id);

            if let Some(existing) = registry.descriptors.get(&identity) {
                if existing.id == descriptor.id {
                    warn!("Camera {} enumerated twice, ignoring duplicate", descriptor.id);
                    continue;
                }
                return Err(Error::IdentityCollision {
                    identity,
                    first: existing.id.clone(),
                    second: descriptor.id,
                });
            }

            debug!("{} -> {}", descriptor, identity);
            registry.order.push(identity);
            registry.descriptors.insert(identity, descriptor);
        }

        if let Some(wanted) = filter {
            if !registry.descriptors.values().any(|d| d.id == wanted) {
                return Err(Error::CameraNotFound(wanted.to_string()));
            }
        }

        let selected: Vec<(CameraIdentity, CameraDescriptor)> = registry
            .enumerated()
            .filter(|(_, d)| filter.is_none_or(|wanted| wanted == d.id))
            .map(|(id, d)| (id, d.clone()))
            .collect();

        for (identity, descriptor) in selected {
            let id = descriptor.id.clone();
            match CameraHandle::open(sdk, identity, descriptor, output.clone()) {
                Ok(handle) => {
                    registry.handles.insert(identity, handle);
                }
                Err(code) => {
                    error!("Could not open camera {}: {}", id, code);
                    registry.unavailable.insert(identity);
                }
            }
        }

        if registry.handles.is_empty() {
            return Err(Error::NoCamerasOpened);
        }

        info!("{} camera(s) ready", registry.handles.len());
        Ok(registry)
    }

    /// Build from already-open handles
    pub fn from_handles(handles: impl IntoIterator<Item = CameraHandle>) -> Self {
        let mut registry = Self::default();
        for handle in handles {
            let identity = handle.identity();
            registry.order.push(identity);
            registry.descriptors.insert(identity, handle.descriptor().clone());
            registry.handles.insert(identity, handle);
        }
        registry
    }

    /// Opened camera identities, in identity order
    pub fn identities(&self) -> Vec<CameraIdentity> {
        self.handles.keys().copied().collect()
    }

    /// Identities reported by `list`: enumeration order, including cameras
    /// left out by the startup filter, excluding those that failed to open
    pub fn listed(&self) -> Vec<CameraIdentity> {
        self.order
            .iter()
            .filter(|id| !self.unavailable.contains(id))
            .copied()
            .collect()
    }

    /// Every enumerated camera, opened or not, in enumeration order
    pub fn enumerated(&self) -> impl Iterator<Item = (CameraIdentity, &CameraDescriptor)> {
        self.order
            .iter()
            .filter_map(|id| self.descriptors.get(id).map(|d| (*id, d)))
    }

    pub fn descriptor(&self, identity: CameraIdentity) -> Option<&CameraDescriptor> {
        self.descriptors.get(&identity)
    }

    pub fn contains(&self, identity: CameraIdentity) -> bool {
        self.handles.contains_key(&identity)
    }

    pub fn get(&self, identity: CameraIdentity) -> Option<&CameraHandle> {
        self.handles.get(&identity)
    }

    pub fn get_mut(&mut self, identity: CameraIdentity) -> Option<&mut CameraHandle> {
        self.handles.get_mut(&identity)
    }

    /// Resolve a packet target to one opened camera
    pub fn resolve(&mut self, target: Target) -> std::result::Result<&mut CameraHandle, ResultCode> {
        match target {
            Target::Camera(identity) => self.get_mut(identity).ok_or(ResultCode::NOT_FOUND),
            Target::All | Target::Invalid => Err(ResultCode::NOT_FOUND),
        }
    }

    pub fn handles(&self) -> impl Iterator<Item = &CameraHandle> {
        self.handles.values()
    }

    pub fn handles_mut(&mut self) -> impl Iterator<Item = &mut CameraHandle> {
        self.handles.values_mut()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Stop every capture and close every camera
    pub fn close_all(&mut self) {
        for handle in self.handles.values_mut() {
            if let Err(code) = handle.close() {
                warn!("Closing {} failed: {}", handle.identity(), code);
            }
        }
    }
}
