use ofvk::prelude::v1::*;
use ofvk::testing::{Call, FakeDevice};
use vk::Handle;

type Point = vk::OpticalFlowSessionBindingPointNV;

struct Fixture {
    cache: CapabilityCache,
    device: FakeDevice,
}

impl Fixture {
    fn new() -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        Self {
            cache: CapabilityCache::new(),
            device: FakeDevice::default(),
        }
    }

    /// Instance with an initialized session and no calls recorded.
    fn instance(&self) -> FlowInstance<&FakeDevice> {
        let mut instance = FlowInstance::with_cache(&self.device, &self.cache).unwrap();
        instance
            .init_session(&InitParams {
                width: 128,
                height: 64,
                input_buffer_format: BufferFormat::Grayscale8,
                ..Default::default()
            })
            .unwrap();
        self.device.clear_calls();
        instance
    }

    /// Register `count` images, returning their handles and views.
    fn register(
        &self,
        instance: &mut FlowInstance<&FakeDevice>,
        count: usize,
    ) -> Vec<(BufferHandle, vk::ImageView)> {
        let out = (0..count)
            .map(|i| {
                let image = unsafe { ExternalImage::new(vk::Image::from_raw(100 + i as u64)) };
                let handle = instance
                    .register_buffer(image, vk::Format::R8_UNORM)
                    .unwrap();
                (handle, *self.device.views().last().unwrap())
            })
            .collect();
        self.device.clear_calls();
        out
    }
}

fn cmd() -> vk::CommandBuffer {
    vk::CommandBuffer::from_raw(0xc0ffee)
}

#[test]
fn absent_handles_bind_nothing() {
    let fixture = Fixture::new();
    let mut instance = fixture.instance();

    for role in [
        BindingRole::Input,
        BindingRole::Reference,
        BindingRole::FlowVector,
        BindingRole::Cost,
        BindingRole::BackwardFlowVector,
        BindingRole::BackwardCost,
        BindingRole::GlobalFlow,
    ] {
        instance.bind(None, role).unwrap();
    }

    assert!(fixture.device.calls().is_empty());
}

#[test]
fn empty_execution_records_once() {
    let fixture = Fixture::new();
    let mut instance = fixture.instance();
    let session = instance.session().unwrap().handle();

    instance
        .record_execute(&Default::default(), &Default::default(), cmd())
        .unwrap();

    assert_eq!(
        fixture.device.calls(),
        vec![Call::Execute {
            command_buffer: cmd(),
            session,
            flags: vk::OpticalFlowExecuteFlagsNV::empty(),
            regions: vec![],
        }]
    );
}

#[test]
fn all_roles_bound_in_order_then_executed() {
    let fixture = Fixture::new();
    let mut instance = fixture.instance();
    let bufs = fixture.register(&mut instance, 7);

    let input = ExecuteInputParams {
        input_frame: Some(bufs[0].0),
        reference_frame: Some(bufs[1].0),
        disable_temporal_hints: true,
        rois: vec![Roi::new(0, 0, 64, 64), Roi::new(64, 0, 32, 32)],
        private_data: None,
    };
    let output = ExecuteOutputParams {
        output: Some(bufs[2].0),
        output_cost: Some(bufs[3].0),
        bwd_output: Some(bufs[4].0),
        bwd_output_cost: Some(bufs[5].0),
        global_flow: Some(bufs[6].0),
    };

    instance.record_execute(&input, &output, cmd()).unwrap();

    let points = [
        Point::INPUT,
        Point::REFERENCE,
        Point::FLOW_VECTOR,
        Point::COST,
        Point::BACKWARD_FLOW_VECTOR,
        Point::BACKWARD_COST,
        Point::GLOBAL_FLOW,
    ];
    let expected = points
        .into_iter()
        .zip(bufs.iter().map(|&(_, v)| v))
        .collect::<Vec<_>>();
    assert_eq!(fixture.device.binds(), expected);

    // Every bind assumes the general layout.
    assert!(fixture
        .device
        .calls()
        .iter()
        .all(|c| !matches!(c, Call::Bind(_, _, _, l) if *l != vk::ImageLayout::GENERAL)));

    let calls = fixture.device.calls();
    assert_eq!(calls.len(), 8);
    let Some(Call::Execute { flags, regions, .. }) = calls.last() else {
        panic!("execution not recorded last");
    };
    assert_eq!(*flags, vk::OpticalFlowExecuteFlagsNV::DISABLE_TEMPORAL_HINTS);
    assert_eq!(regions.len(), 2);
    assert_eq!((regions[0].offset.x, regions[0].offset.y), (0, 0));
    assert_eq!((regions[0].extent.width, regions[0].extent.height), (64, 64));
    assert_eq!((regions[1].offset.x, regions[1].offset.y), (64, 0));
    assert_eq!((regions[1].extent.width, regions[1].extent.height), (32, 32));
}

#[test]
fn failed_bind_records_nothing() {
    let fixture = Fixture::new();
    let mut instance = fixture.instance();
    let bufs = fixture.register(&mut instance, 3);

    fixture
        .device
        .fail_bind_of(bufs[2].1, vk::Result::ERROR_FORMAT_NOT_SUPPORTED);

    let input = ExecuteInputParams {
        input_frame: Some(bufs[0].0),
        reference_frame: Some(bufs[1].0),
        ..Default::default()
    };
    let output = ExecuteOutputParams {
        output: Some(bufs[2].0),
        ..Default::default()
    };

    assert_eq!(
        instance.record_execute(&input, &output, cmd()),
        Err(Error::Bind {
            role: BindingRole::FlowVector,
            result: vk::Result::ERROR_FORMAT_NOT_SUPPORTED
        })
    );
    assert_eq!(fixture.device.executions(), 0);
    // Nothing after the failing bind is attempted.
    assert_eq!(fixture.device.binds().len(), 3);
}

#[test]
fn stale_handle_records_nothing() {
    let fixture = Fixture::new();
    let mut instance = fixture.instance();
    let bufs = fixture.register(&mut instance, 2);

    instance.unregister_buffer(bufs[1].0).unwrap();
    fixture.device.clear_calls();

    let input = ExecuteInputParams {
        input_frame: Some(bufs[0].0),
        reference_frame: Some(bufs[1].0),
        ..Default::default()
    };

    assert_eq!(
        instance.record_execute(&input, &Default::default(), cmd()),
        Err(Error::InvalidHandle(bufs[1].0))
    );
    assert_eq!(fixture.device.executions(), 0);
}

#[test]
fn input_mips_bound_in_ascending_order() {
    let fixture = Fixture::new();
    let mut instance = fixture.instance();
    let bufs = fixture.register(&mut instance, 6);

    let mut mips = InputMips::default();
    // Populated out of order on purpose, plus a half populated level.
    mips.set_level(4, Some(bufs[4].0), Some(bufs[5].0));
    mips.set_level(1, Some(bufs[2].0), Some(bufs[3].0));
    mips.set_level(2, Some(bufs[0].0), None);

    let input = ExecuteInputParams {
        input_frame: Some(bufs[0].0),
        reference_frame: Some(bufs[1].0),
        private_data: Some(mips.into_private_data()),
        ..Default::default()
    };

    instance
        .record_execute(&input, &Default::default(), cmd())
        .unwrap();

    assert_eq!(
        fixture.device.binds(),
        vec![
            (Point::INPUT, bufs[0].1),
            (Point::REFERENCE, bufs[1].1),
            (Point::INPUT, bufs[2].1),
            (Point::REFERENCE, bufs[3].1),
            (Point::INPUT, bufs[4].1),
            (Point::REFERENCE, bufs[5].1),
        ]
    );
    assert_eq!(fixture.device.executions(), 1);
}

#[test]
fn other_private_data_ids_never_bind_mips() {
    let fixture = Fixture::new();
    let mut instance = fixture.instance();
    let bufs = fixture.register(&mut instance, 2);

    let mut mips = InputMips::default();
    mips.set_level(0, Some(bufs[0].0), Some(bufs[1].0));
    let mut private_data = mips.into_private_data();
    private_data.id = EXECUTE_PRIV_DATA_ID_INPUT_MIPS + 1;

    let input = ExecuteInputParams {
        private_data: Some(private_data),
        ..Default::default()
    };

    instance
        .record_execute(&input, &Default::default(), cmd())
        .unwrap();

    assert!(fixture.device.binds().is_empty());
    assert_eq!(fixture.device.executions(), 1);
}

#[test]
fn truncated_mips_payload_rejected() {
    let fixture = Fixture::new();
    let mut instance = fixture.instance();
    let bufs = fixture.register(&mut instance, 1);

    let input = ExecuteInputParams {
        input_frame: Some(bufs[0].0),
        private_data: Some(PrivateData::new(EXECUTE_PRIV_DATA_ID_INPUT_MIPS, vec![0; 16])),
        ..Default::default()
    };

    assert!(matches!(
        instance.record_execute(&input, &Default::default(), cmd()),
        Err(Error::MalformedPrivateData { id: 6, len: 16, .. })
    ));
    assert!(fixture.device.calls().is_empty());
}

#[test]
fn unrepresentable_roi_records_nothing() {
    let fixture = Fixture::new();
    let mut instance = fixture.instance();
    let bufs = fixture.register(&mut instance, 2);

    let input = ExecuteInputParams {
        input_frame: Some(bufs[0].0),
        reference_frame: Some(bufs[1].0),
        rois: vec![Roi::new(0, 0, 64, 64), Roi::new(0x8000_0000, 5, 16, 16)],
        ..Default::default()
    };

    assert_eq!(
        instance.record_execute(&input, &Default::default(), cmd()),
        Err(Error::UnsupportedParameter {
            name: "roi offset",
            value: 0x8000_0000
        })
    );
    // Rejected before the first bind.
    assert!(fixture.device.calls().is_empty());
}

#[test]
fn failing_mip_bind_aborts() {
    let fixture = Fixture::new();
    let mut instance = fixture.instance();
    let bufs = fixture.register(&mut instance, 4);

    fixture
        .device
        .fail_bind_of(bufs[3].1, vk::Result::ERROR_UNKNOWN);

    let mut mips = InputMips::default();
    mips.set_level(0, Some(bufs[0].0), Some(bufs[1].0));
    mips.set_level(1, Some(bufs[2].0), Some(bufs[3].0));

    let input = ExecuteInputParams {
        private_data: Some(mips.into_private_data()),
        ..Default::default()
    };

    assert_eq!(
        instance.record_execute(&input, &Default::default(), cmd()),
        Err(Error::Bind {
            role: BindingRole::Reference,
            result: vk::Result::ERROR_UNKNOWN
        })
    );
    assert_eq!(fixture.device.executions(), 0);
}
