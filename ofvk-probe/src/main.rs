//! Report optical flow support of every Vulkan device

use anyhow::{anyhow, Result};
use ash::vk;
use clap::*;
use log::*;
use ofvk::prelude::v1::*;
use ofvk::queue::find_optical_flow_family;

fn main() -> Result<()> {
    env_logger::init();

    let matches = Command::new("ofvk-probe")
        .version(crate_version!())
        .author(crate_authors!())
        .arg(
            Arg::new("session")
                .long("session")
                .short('s')
                .takes_value(true)
                .required(false)
                .help("JSON session parameters to try creating a session with"),
        )
        .arg(
            Arg::new("device")
                .long("device")
                .short('d')
                .takes_value(true)
                .required(false)
                .help("Only probe the device at this index"),
        )
        .get_matches();

    let session_params = matches
        .value_of("session")
        .map(|path| -> Result<InitParams> {
            let file = std::fs::File::open(path)?;
            Ok(serde_json::from_reader(file)?)
        })
        .transpose()?;

    let only_device: Option<usize> = matches.value_of("device").map(str::parse).transpose()?;

    let entry = unsafe { ash::Entry::load()? };

    let app_info = vk::ApplicationInfo::default()
        .application_name(c"ofvk-probe")
        .api_version(vk::API_VERSION_1_3);

    let instance_info = vk::InstanceCreateInfo::default().application_info(&app_info);

    let instance = unsafe { entry.create_instance(&instance_info, None)? };

    let res = probe_all(&instance, only_device, session_params.as_ref());

    unsafe { instance.destroy_instance(None) };

    res
}

fn probe_all(
    instance: &ash::Instance,
    only_device: Option<usize>,
    session_params: Option<&InitParams>,
) -> Result<()> {
    let physical_devices = unsafe { instance.enumerate_physical_devices()? };

    if physical_devices.is_empty() {
        return Err(anyhow!("No Vulkan devices found"));
    }

    for (i, &physical_device) in physical_devices.iter().enumerate() {
        if only_device.map(|d| d != i).unwrap_or(false) {
            continue;
        }

        let props = unsafe { instance.get_physical_device_properties(physical_device) };
        let name = props
            .device_name_as_c_str()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        println!("[{i}] {name}");

        if let Err(e) = probe(instance, physical_device, session_params) {
            println!("    {e}");
        }
    }

    Ok(())
}

fn probe(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
    session_params: Option<&InitParams>,
) -> Result<()> {
    let families =
        unsafe { instance.get_physical_device_queue_family_properties(physical_device) };

    let extensions = unsafe { instance.enumerate_device_extension_properties(physical_device)? };
    let supported = extensions
        .iter()
        .filter_map(|e| e.extension_name_as_c_str().ok())
        .any(|name| name == Capability::OPTICAL_FLOW.name());

    println!(
        "    {}: {}",
        Capability::OPTICAL_FLOW.display_name(),
        if supported { "yes" } else { "no" }
    );

    let queue_family = match (supported, find_optical_flow_family(&families)) {
        (true, Some(family)) => family,
        (true, None) => return Err(anyhow!("no optical flow queue family")),
        (false, _) => return Ok(()),
    };

    let priorities = [1.0f32];
    let queue_info = vk::DeviceQueueCreateInfo::default()
        .queue_family_index(queue_family)
        .queue_priorities(&priorities);

    let extension_names = [Capability::OPTICAL_FLOW.name().as_ptr()];

    let mut sync2 = vk::PhysicalDeviceSynchronization2Features::default().synchronization2(true);
    let mut optical_flow = vk::PhysicalDeviceOpticalFlowFeaturesNV::default().optical_flow(true);

    let device_info = vk::DeviceCreateInfo::default()
        .queue_create_infos(std::slice::from_ref(&queue_info))
        .enabled_extension_names(&extension_names)
        .push_next(&mut sync2)
        .push_next(&mut optical_flow);

    let device = unsafe { instance.create_device(physical_device, &device_info, None)? };

    let res = probe_device(instance, physical_device, &device, session_params);

    unsafe { device.destroy_device(None) };

    res
}

fn probe_device(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
    device: &ash::Device,
    session_params: Option<&InitParams>,
) -> Result<()> {
    let device = unsafe { VulkanDevice::new(instance, physical_device, device) };

    let mut flow = FlowInstance::new(device)?;

    println!("    queue family: {}", flow.queue_family_index());

    for param in CapsParam::ALL {
        match flow.get_caps(param) {
            Ok(values) => println!("    {param:?}: {values:?}"),
            Err(e) => debug!("{param:?}: {e}"),
        }
    }

    if let Some(params) = session_params {
        match flow.init_session(params) {
            Ok(()) => println!(
                "    session {}x{} {:?}: ok",
                params.width, params.height, params.input_buffer_format
            ),
            Err(e) => println!("    session: {e}"),
        }
        flow.destroy_session();
    }

    Ok(())
}
