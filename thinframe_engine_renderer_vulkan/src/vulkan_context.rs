/// GpuContext - Vulkan handles shared by every GPU object of one device
///
/// Built bottom-up: instance (with optional debug messenger) and surface,
/// then the logical device, then the allocator. Each layer owns its handles
/// and releases them on drop, so a failure at any step tears down exactly the
/// layers that were already created.
///
/// Release order: wait idle, allocator, logical device, surface, debug
/// messenger, instance.

use ash::vk;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::ffi::CStr;
use std::mem::ManuallyDrop;
use std::sync::{Mutex, MutexGuard};
use thinframe_engine::thinframe::{Config, Error, Result};
use thinframe_engine::{engine_debug, engine_error, engine_info, engine_warn};

// ============================================================================
// Queue family selection
// ============================================================================

/// What one queue family of a physical device can do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct QueueFamilySupport {
    pub graphics: bool,
    pub present: bool,
}

/// Graphics and present queue family indices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct QueueFamilies {
    pub graphics: u32,
    pub present: u32,
}

impl QueueFamilies {
    pub fn shared(&self) -> bool {
        self.graphics == self.present
    }
}

/// Pick the graphics and present families of a device
///
/// A family that does both is preferred. Otherwise the first graphics family
/// and the first present family are used.
pub(crate) fn select_queue_families(families: &[QueueFamilySupport]) -> Option<QueueFamilies> {
    if let Some(index) = families.iter().position(|f| f.graphics && f.present) {
        return Some(QueueFamilies { graphics: index as u32, present: index as u32 });
    }
    let graphics = families.iter().position(|f| f.graphics)?;
    let present = families.iter().position(|f| f.present)?;
    Some(QueueFamilies { graphics: graphics as u32, present: present as u32 })
}

/// True when `available` lists every extension of `required`
pub(crate) fn has_extensions(available: &[&CStr], required: &[&CStr]) -> bool {
    required.iter().all(|name| available.contains(name))
}

fn creation_failed(what: &str, detail: impl std::fmt::Debug) -> Error {
    engine_error!("thinframe::vulkan", "{}: {:?}", what, detail);
    Error::DeviceCreationFailed(format!("{}: {:?}", what, detail))
}

// ============================================================================
// Instance layer
// ============================================================================

/// Validation messenger, destroyed before the instance
struct DebugMessenger {
    loader: ash::ext::debug_utils::Instance,
    messenger: vk::DebugUtilsMessengerEXT,
}

/// Entry, instance, optional messenger and the window surface
pub(crate) struct InstanceChain {
    pub(crate) entry: ash::Entry,
    pub(crate) instance: ash::Instance,
    pub(crate) surface_loader: ash::khr::surface::Instance,
    pub(crate) surface: vk::SurfaceKHR,
    debug: Option<DebugMessenger>,
}

impl InstanceChain {
    fn new<W: HasDisplayHandle + HasWindowHandle + ?Sized>(window: &W, config: &Config) -> Result<Self> {
        unsafe {
            let entry = ash::Entry::load()
                .map_err(|e| creation_failed("Failed to load Vulkan library", e))?;

            let app_name = std::ffi::CString::new(config.app_name.as_str())
                .map_err(|e| creation_failed("Invalid application name", e))?;
            let (major, minor, patch) = config.app_version;
            let app_info = vk::ApplicationInfo::default()
                .application_name(&app_name)
                .application_version(vk::make_api_version(0, major, minor, patch))
                .engine_name(c"Thinframe")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_2);

            let display_handle = window
                .display_handle()
                .map_err(|e| creation_failed("Failed to get display handle", e))?;
            let mut extension_names = ash_window::enumerate_required_extensions(display_handle.as_raw())
                .map_err(|e| creation_failed("Failed to get required surface extensions", e))?
                .to_vec();

            let validation = validation_requested(config);
            if validation {
                extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
            }
            let layer_names = if validation {
                vec![c"VK_LAYER_KHRONOS_validation".as_ptr()]
            } else {
                vec![]
            };

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);

            let instance = entry
                .create_instance(&create_info, None)
                .map_err(|e| creation_failed("Failed to create Vulkan instance", e))?;
            let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);

            // From here on, dropping `chain` releases what exists so far
            let mut chain = Self {
                entry,
                instance,
                surface_loader,
                surface: vk::SurfaceKHR::null(),
                debug: None,
            };

            if validation {
                chain.debug = create_debug_messenger(&chain.entry, &chain.instance, config);
            }

            let window_handle = window
                .window_handle()
                .map_err(|e| creation_failed("Failed to get window handle", e))?;
            chain.surface = ash_window::create_surface(
                &chain.entry,
                &chain.instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
            .map_err(|e| creation_failed("Failed to create window surface", e))?;

            Ok(chain)
        }
    }
}

impl Drop for InstanceChain {
    fn drop(&mut self) {
        unsafe {
            if self.surface != vk::SurfaceKHR::null() {
                self.surface_loader.destroy_surface(self.surface, None);
            }
            if let Some(debug) = self.debug.take() {
                crate::debug::cleanup_debug_config();
                debug.loader.destroy_debug_utils_messenger(debug.messenger, None);
            }
            self.instance.destroy_instance(None);
        }
    }
}

#[cfg(feature = "vulkan-validation")]
fn validation_requested(config: &Config) -> bool {
    config.enable_validation
}

#[cfg(not(feature = "vulkan-validation"))]
fn validation_requested(config: &Config) -> bool {
    if config.enable_validation {
        engine_debug!("thinframe::vulkan", "Validation requested but the vulkan-validation feature is disabled");
    }
    false
}

/// A missing messenger only costs diagnostics, so failures are warnings
fn create_debug_messenger(entry: &ash::Entry, instance: &ash::Instance, config: &Config) -> Option<DebugMessenger> {
    let loader = ash::ext::debug_utils::Instance::new(entry, instance);

    crate::debug::init_debug_config(crate::debug::DebugConfig {
        severity: config.debug_severity,
        output: config.debug_output.clone(),
        enable_stats: config.enable_validation_stats,
    });

    let debug_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
        .message_severity(crate::debug::severity_flags(config.debug_severity))
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(crate::debug::vulkan_debug_callback));

    match unsafe { loader.create_debug_utils_messenger(&debug_info, None) } {
        Ok(messenger) => Some(DebugMessenger { loader, messenger }),
        Err(e) => {
            engine_warn!("thinframe::vulkan", "Debug messenger unavailable, continuing without it: {:?}", e);
            crate::debug::cleanup_debug_config();
            None
        }
    }
}

// ============================================================================
// Device layer
// ============================================================================

/// Logical device, destroyed on drop
pub(crate) struct LogicalDevice {
    pub(crate) raw: ash::Device,
}

impl Drop for LogicalDevice {
    fn drop(&mut self) {
        unsafe {
            self.raw.destroy_device(None);
        }
    }
}

/// Physical device chosen for a surface
struct Adapter {
    physical_device: vk::PhysicalDevice,
    families: QueueFamilies,
    name: String,
}

/// First device with graphics, present and swapchain support; no scoring
fn pick_adapter(chain: &InstanceChain) -> Result<Adapter> {
    unsafe {
        let physical_devices = chain
            .instance
            .enumerate_physical_devices()
            .map_err(|e| creation_failed("Failed to enumerate physical devices", e))?;

        for physical_device in physical_devices {
            let properties = chain.instance.get_physical_device_properties(physical_device);
            let name = properties
                .device_name_as_c_str()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|_| "Unknown GPU".to_string());

            let extensions = match chain.instance.enumerate_device_extension_properties(physical_device) {
                Ok(extensions) => extensions,
                Err(e) => {
                    engine_debug!("thinframe::vulkan", "Skipping {}: cannot list extensions ({:?})", name, e);
                    continue;
                }
            };
            let extension_names: Vec<&CStr> = extensions
                .iter()
                .filter_map(|ext| ext.extension_name_as_c_str().ok())
                .collect();
            if !has_extensions(&extension_names, &[ash::khr::swapchain::NAME]) {
                engine_debug!("thinframe::vulkan", "Skipping {}: no swapchain support", name);
                continue;
            }

            let support: Vec<QueueFamilySupport> = chain
                .instance
                .get_physical_device_queue_family_properties(physical_device)
                .iter()
                .enumerate()
                .map(|(index, family)| QueueFamilySupport {
                    graphics: family.queue_flags.contains(vk::QueueFlags::GRAPHICS),
                    present: chain
                        .surface_loader
                        .get_physical_device_surface_support(physical_device, index as u32, chain.surface)
                        .unwrap_or(false),
                })
                .collect();

            match select_queue_families(&support) {
                Some(families) => return Ok(Adapter { physical_device, families, name }),
                None => engine_debug!("thinframe::vulkan", "Skipping {}: missing graphics or present queue", name),
            }
        }

        Err(creation_failed("No suitable GPU found", "no device with graphics, present and swapchain support"))
    }
}

fn create_logical_device(chain: &InstanceChain, adapter: &Adapter) -> Result<LogicalDevice> {
    let queue_priorities = [1.0];
    let mut queue_create_infos = vec![vk::DeviceQueueCreateInfo::default()
        .queue_family_index(adapter.families.graphics)
        .queue_priorities(&queue_priorities)];
    if !adapter.families.shared() {
        queue_create_infos.push(
            vk::DeviceQueueCreateInfo::default()
                .queue_family_index(adapter.families.present)
                .queue_priorities(&queue_priorities),
        );
    }

    let device_extension_names = [ash::khr::swapchain::NAME.as_ptr()];
    let device_features = vk::PhysicalDeviceFeatures::default();
    let device_create_info = vk::DeviceCreateInfo::default()
        .queue_create_infos(&queue_create_infos)
        .enabled_extension_names(&device_extension_names)
        .enabled_features(&device_features);

    let raw = unsafe {
        chain
            .instance
            .create_device(adapter.physical_device, &device_create_info, None)
            .map_err(|e| creation_failed("Failed to create logical device", e))?
    };
    Ok(LogicalDevice { raw })
}

// ============================================================================
// GpuContext
// ============================================================================

/// Shared GPU context for all Vulkan objects of one device
///
/// Every object created by the device holds an `Arc<GpuContext>`, so the
/// context outlives all of them.
pub struct GpuContext {
    /// Dropped by hand before the device
    allocator: ManuallyDrop<Mutex<Allocator>>,

    pub(crate) swapchain_loader: ash::khr::swapchain::Device,
    pub(crate) physical_device: vk::PhysicalDevice,
    pub(crate) graphics_queue: vk::Queue,
    pub(crate) present_queue: vk::Queue,
    pub(crate) families: QueueFamilies,
    pub(crate) device_name: String,

    /// Serializes queue submission, presentation and idle waits
    queue_lock: Mutex<()>,

    // Field order is release order
    device: LogicalDevice,
    instance: InstanceChain,
}

impl GpuContext {
    /// Create instance, surface, device, queues and allocator for `window`
    ///
    /// # Errors
    ///
    /// `Error::DeviceCreationFailed` on any failure. Handles created before the
    /// failing step are released.
    pub(crate) fn new<W: HasDisplayHandle + HasWindowHandle + ?Sized>(window: &W, config: &Config) -> Result<Self> {
        let instance = InstanceChain::new(window, config)?;
        let adapter = pick_adapter(&instance)?;
        let device = create_logical_device(&instance, &adapter)?;

        let (graphics_queue, present_queue) = unsafe {
            (
                device.raw.get_device_queue(adapter.families.graphics, 0),
                device.raw.get_device_queue(adapter.families.present, 0),
            )
        };

        let allocator = Allocator::new(&AllocatorCreateDesc {
            instance: instance.instance.clone(),
            device: device.raw.clone(),
            physical_device: adapter.physical_device,
            debug_settings: Default::default(),
            buffer_device_address: false,
            allocation_sizes: Default::default(),
        })
        .map_err(|e| creation_failed("Failed to create GPU allocator", e))?;

        let swapchain_loader = ash::khr::swapchain::Device::new(&instance.instance, &device.raw);

        engine_info!(
            "thinframe::vulkan",
            "Selected GPU '{}' (graphics family {}, present family {})",
            adapter.name,
            adapter.families.graphics,
            adapter.families.present
        );

        Ok(Self {
            allocator: ManuallyDrop::new(Mutex::new(allocator)),
            swapchain_loader,
            physical_device: adapter.physical_device,
            graphics_queue,
            present_queue,
            families: adapter.families,
            device_name: adapter.name,
            queue_lock: Mutex::new(()),
            device,
            instance,
        })
    }

    pub fn device(&self) -> &ash::Device {
        &self.device.raw
    }

    pub(crate) fn surface(&self) -> vk::SurfaceKHR {
        self.instance.surface
    }

    pub(crate) fn surface_loader(&self) -> &ash::khr::surface::Instance {
        &self.instance.surface_loader
    }

    pub(crate) fn allocator(&self) -> Result<MutexGuard<'_, Allocator>> {
        self.allocator
            .lock()
            .map_err(|_| Error::BackendError("GPU allocator lock poisoned".to_string()))
    }

    /// Exclusive access to the queues
    pub(crate) fn queues(&self) -> MutexGuard<'_, ()> {
        self.queue_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        unsafe {
            let _queues = self.queues();
            self.device.raw.device_wait_idle().ok();
        }
        // Free VkDeviceMemory blocks while the device still exists
        unsafe {
            ManuallyDrop::drop(&mut self.allocator);
        }
        engine_debug!("thinframe::vulkan", "Releasing Vulkan device '{}'", self.device_name);
        // `device` then `instance` are dropped next, in field order
    }
}
