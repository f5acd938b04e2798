//! Vulkan setup on vulkano: instance, validation, device selection. The
//! per-thread GPU state lives in [`backend`].

mod backend;
mod q;

pub use backend::VulkanState;

use crate::error::StartupError;
use crate::state::q::QueueFamilyIndices;
use std::sync::Arc;
use vulkano::device::{Device, DeviceExtensions, Features, Queue};
use vulkano::instance::{
    debug::DebugCallback, debug::MessageSeverity, debug::MessageType, layers_list, ApplicationInfo,
    Instance, InstanceExtensions, PhysicalDevice, Version,
};
use vulkano::swapchain::Surface;
use winit::window::Window;

#[cfg(debug_assertions)]
const ENABLE_VALIDATION_LAYERS: bool = true;
#[cfg(not(debug_assertions))]
const ENABLE_VALIDATION_LAYERS: bool = false;

const VALIDATION_LAYERS: &[&str] = &["VK_LAYER_KHRONOS_validation"];

/// Required device extensions
fn device_extensions() -> DeviceExtensions {
    DeviceExtensions {
        khr_swapchain: true,
        ..DeviceExtensions::none()
    }
}

fn check_validation_layer_support() -> bool {
    let layers: Vec<String> = match layers_list() {
        Ok(layers) => layers.map(|l| l.name().to_owned()).collect(),
        Err(e) => {
            log::warn!("cannot list instance layers: {:?}", e);
            return false;
        }
    };
    log::debug!("available layers: {:?}", layers);
    VALIDATION_LAYERS
        .iter()
        .all(|layer_name| layers.iter().any(|l| l == layer_name))
}

fn required_extensions() -> InstanceExtensions {
    let mut extensions = vulkano_win::required_extensions();
    if ENABLE_VALIDATION_LAYERS {
        extensions.ext_debug_utils = true;
    }
    extensions
}

pub fn create_instance() -> Result<Arc<Instance>, StartupError> {
    let version = Version {
        major: 0,
        minor: 1,
        patch: 0,
    };
    let app_info = ApplicationInfo {
        application_name: Some("sanpo".into()),
        application_version: Some(version),
        engine_name: Some("keikan".into()),
        engine_version: Some(version),
    };
    let extensions = required_extensions();
    let validation = ENABLE_VALIDATION_LAYERS && check_validation_layer_support();
    if ENABLE_VALIDATION_LAYERS && !validation {
        log::warn!("validation layers requested, but not available");
    }
    let layers: &[&str] = if validation { VALIDATION_LAYERS } else { &[] };
    Instance::new(Some(&app_info), &extensions, layers.iter().cloned())
        .map_err(|e| StartupError::Instance(e.to_string()))
}

/// Routes validation messages into the log. Keep the returned callback alive
/// for as long as the instance.
pub fn setup_debug_callback(instance: &Arc<Instance>) -> Option<DebugCallback> {
    if !ENABLE_VALIDATION_LAYERS {
        return None;
    }
    let msg_severity = MessageSeverity {
        error: true,
        warning: true,
        information: false,
        verbose: false,
    };
    DebugCallback::new(instance, msg_severity, MessageType::all(), |msg| {
        if msg.severity.error {
            log::error!("validation layer: {}", msg.description);
        } else {
            log::warn!("validation layer: {}", msg.description);
        }
    })
    .ok()
}

fn find_queue_families(surface: &Arc<Surface<Window>>, device: &PhysicalDevice) -> QueueFamilyIndices {
    let mut indices = QueueFamilyIndices::new();
    for queue_family in device.queue_families() {
        if queue_family.supports_graphics() && indices.graphics_family.is_none() {
            indices.graphics_family = Some(queue_family.id());
        }
        if surface.is_supported(queue_family).unwrap_or(false) && indices.present_family.is_none() {
            indices.present_family = Some(queue_family.id());
        }
        if indices.is_complete() {
            break;
        }
    }
    indices
}

fn check_device_support_extension(device: &PhysicalDevice) -> bool {
    let available_extensions = DeviceExtensions::supported_by_device(*device);
    let device_extensions = device_extensions();
    available_extensions.intersection(&device_extensions) == device_extensions
}

fn is_device_suitable(device: &PhysicalDevice, surface: &Arc<Surface<Window>>) -> bool {
    let indices = find_queue_families(surface, device);
    let extension_supported = check_device_support_extension(device);
    let swap_chain_adequate = extension_supported
        && match surface.capabilities(*device) {
            Ok(capabilities) => {
                !capabilities.supported_formats.is_empty()
                    && capabilities.present_modes.iter().next().is_some()
            }
            Err(_) => false,
        };
    indices.is_complete() && swap_chain_adequate
}

/// Logical device and queues for one presentation surface. Opened on the main
/// thread so a missing GPU is reported before any worker starts; the render
/// thread turns it into a [`VulkanState`].
pub struct VulkanDevice {
    device: Arc<Device>,
    graphics_queue: Arc<Queue>,
    present_queue: Arc<Queue>,
    surface: Arc<Surface<Window>>,
}

fn device_features(statistics: bool, supported: &Features) -> Result<Features, StartupError> {
    if statistics && !supported.pipeline_statistics_query {
        return Err(StartupError::MissingFeature("pipeline statistics"));
    }
    Ok(Features {
        pipeline_statistics_query: statistics,
        ..Features::none()
    })
}

impl VulkanDevice {
    pub fn open(
        instance: &Arc<Instance>,
        surface: Arc<Surface<Window>>,
        statistics: bool,
    ) -> Result<Self, StartupError> {
        let physical_device = PhysicalDevice::enumerate(instance)
            .find(|device| is_device_suitable(device, &surface))
            .ok_or(StartupError::NoSuitableDevice)?;
        log::info!(
            "using {} ({:?})",
            physical_device.name(),
            physical_device.ty()
        );
        let features = device_features(statistics, physical_device.supported_features())?;

        let indices = find_queue_families(&surface, &physical_device);
        let queue_priority = 1.0;
        let queue_families = indices
            .unique()
            .into_iter()
            .filter_map(|id| physical_device.queue_family_by_id(id))
            .map(|family| (family, queue_priority));

        let (device, mut queues) = Device::new(
            physical_device,
            &features,
            &device_extensions(),
            queue_families,
        )
        .map_err(|e| StartupError::Device(e.to_string()))?;
        let graphics_queue = queues
            .next()
            .ok_or_else(|| StartupError::Device("no graphics queue".into()))?;
        let present_queue = queues.next().unwrap_or_else(|| graphics_queue.clone());

        Ok(VulkanDevice {
            device,
            graphics_queue,
            present_queue,
            surface,
        })
    }

    /// Factory for the render thread.
    pub fn into_backend(self) -> VulkanState {
        VulkanState::new(
            self.device,
            self.graphics_queue,
            self.present_queue,
            self.surface,
        )
    }
}
