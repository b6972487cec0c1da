//! End-to-end handler scenarios
//!
//! Drives the public operations through recording mock collaborators:
//! registration, downlink queueing, and the uplink path with its
//! collation window, gateway selection, downlink pairing and failure
//! propagation.

use lorawan_handler::{
    AckNacker, AppEui, AppPacket, BrokerRegistration, DevAddr, DevEui, DeviceEntry, DeviceStore,
    Direction, DownlinkPacket, DownlinkQueue, Error, ErrorKind, GatewayAdapter, Handler,
    HandlerConfig, JoinPacket, Metadata, Recipient, Registration, Result, SessionCrypto,
    Subscriber, UplinkPacket,
};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

const APP_S_KEY: [u8; 16] = [1, 1, 1, 1, 2, 2, 2, 2, 1, 1, 1, 1, 2, 2, 2, 2];
const NWK_S_KEY: [u8; 16] = [4, 4, 4, 4, 3, 3, 3, 3, 4, 4, 4, 4, 3, 3, 3, 3];

fn app_eui() -> AppEui {
    AppEui::from_bytes([1; 8])
}

fn dev_eui() -> DevEui {
    DevEui::from_bytes([2; 8])
}

fn dev_addr() -> DevAddr {
    DevAddr::from_bytes([2, 2, 2, 2])
}

fn session_crypto() -> SessionCrypto {
    SessionCrypto::new(APP_S_KEY, NWK_S_KEY, dev_addr())
}

fn device_entry() -> DeviceEntry {
    DeviceEntry {
        recipient: b"app-endpoint".to_vec(),
        dev_addr: dev_addr(),
        app_s_key: APP_S_KEY,
        nwk_s_key: NWK_S_KEY,
    }
}

fn registration() -> Registration {
    Registration {
        app_eui: AppEui::from_bytes([2; 8]),
        dev_eui: DevEui::from_bytes([1; 8]),
        nwk_s_key: NWK_S_KEY,
        app_s_key: APP_S_KEY,
        recipient: b"app-endpoint".to_vec(),
    }
}

/// Encode an uplink frame the way a device + gateway would produce it
fn uplink_frame(payload: &[u8], metadata: Metadata, fcnt: u32) -> Vec<u8> {
    let crypto = session_crypto();
    let ciphertext = crypto.cipher_payload(Direction::Up, fcnt, payload);
    let mic = crypto.compute_mic(Direction::Up, fcnt, &ciphertext).unwrap();
    UplinkPacket {
        app_eui: app_eui(),
        dev_eui: dev_eui(),
        payload: ciphertext,
        metadata,
        fcnt,
        mic,
    }
    .to_bytes()
    .unwrap()
}

fn meta(duty: Option<u32>, rssi: Option<i32>) -> Metadata {
    Metadata {
        duty,
        rssi,
        ..Default::default()
    }
}

fn make_handler(devices: Arc<MockDeviceStore>, queue: Arc<MockDownlinkQueue>) -> Arc<Handler> {
    Arc::new(Handler::new(
        devices,
        queue,
        Recipient::new(b"broker-endpoint".to_vec()),
        HandlerConfig::default(),
    ))
}

// ---------------------------------------------------------------- mocks

#[derive(Default)]
struct MockDeviceStore {
    out_lookup: Option<DeviceEntry>,
    fail_lookup: Option<Error>,
    fail_store: Option<Error>,
    in_store: Mutex<Option<Registration>>,
}

impl DeviceStore for MockDeviceStore {
    fn lookup(&self, _app_eui: AppEui, _dev_eui: DevEui) -> Result<DeviceEntry> {
        if let Some(err) = &self.fail_lookup {
            return Err(err.clone());
        }
        self.out_lookup
            .clone()
            .ok_or_else(|| Error::Behavioural("device not registered".to_string()))
    }

    fn store_personalized(&self, registration: &Registration) -> Result<()> {
        *self.in_store.lock().unwrap() = Some(registration.clone());
        if let Some(err) = &self.fail_store {
            return Err(err.clone());
        }
        Ok(())
    }
}

#[derive(Default)]
struct MockDownlinkQueue {
    out_pull: Mutex<Option<AppPacket>>,
    fail_pull: Option<Error>,
    fail_push: Option<Error>,
    in_push: Mutex<Option<AppPacket>>,
}

impl DownlinkQueue for MockDownlinkQueue {
    fn push(&self, _app_eui: AppEui, _dev_eui: DevEui, packet: AppPacket) -> Result<()> {
        *self.in_push.lock().unwrap() = Some(packet);
        if let Some(err) = &self.fail_push {
            return Err(err.clone());
        }
        Ok(())
    }

    fn pull(&self, _app_eui: AppEui, _dev_eui: DevEui) -> Result<AppPacket> {
        if let Some(err) = &self.fail_pull {
            return Err(err.clone());
        }
        self.out_pull
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| Error::Behavioural("no downlink pending".to_string()))
    }
}

#[derive(Default)]
struct MockAdapter {
    fail_get_recipient: Option<Error>,
    fail_send: Option<Error>,
    in_send_packet: Mutex<Option<AppPacket>>,
    in_send_recipients: Mutex<Option<Vec<Recipient>>>,
}

impl GatewayAdapter for MockAdapter {
    fn get_recipient(&self, raw: &[u8]) -> Result<Recipient> {
        if let Some(err) = &self.fail_get_recipient {
            return Err(err.clone());
        }
        Ok(Recipient::new(raw.to_vec()))
    }

    fn send(&self, packet: &AppPacket, recipients: &[Recipient]) -> Result<()> {
        // Record the attempt before reporting any failure.
        *self.in_send_packet.lock().unwrap() = Some(packet.clone());
        *self.in_send_recipients.lock().unwrap() = Some(recipients.to_vec());
        if let Some(err) = &self.fail_send {
            return Err(err.clone());
        }
        Ok(())
    }
}

#[derive(Default)]
struct MockAckNacker {
    in_ack: Option<Option<DownlinkPacket>>,
}

impl AckNacker for MockAckNacker {
    fn ack(&mut self, reply: Option<DownlinkPacket>) -> Result<()> {
        self.in_ack = Some(reply);
        Ok(())
    }

    fn nack(&mut self) -> Result<()> {
        Ok(())
    }
}

#[derive(Default)]
struct MockSubscriber {
    in_subscribe: Option<BrokerRegistration>,
}

impl Subscriber for MockSubscriber {
    fn subscribe(&mut self, registration: &BrokerRegistration) -> Result<()> {
        self.in_subscribe = Some(registration.clone());
        Ok(())
    }
}

// ------------------------------------------------------------- register

#[test]
fn test_register_valid() {
    let devices = Arc::new(MockDeviceStore::default());
    let queue = Arc::new(MockDownlinkQueue::default());
    let handler = make_handler(Arc::clone(&devices), Arc::clone(&queue));
    let mut an = MockAckNacker::default();
    let mut sub = MockSubscriber::default();
    let reg = registration();

    handler.register(&reg, &mut an, &mut sub).unwrap();

    assert_eq!(*devices.in_store.lock().unwrap(), Some(reg.clone()));
    let forwarded = sub.in_subscribe.expect("no broker registration forwarded");
    assert_eq!(forwarded.app_eui, reg.app_eui);
    assert_eq!(forwarded.dev_eui, reg.dev_eui);
    assert_eq!(forwarded.nwk_s_key, reg.nwk_s_key);
    assert_eq!(forwarded.recipient, b"broker-endpoint");
    assert!(queue.in_push.lock().unwrap().is_none());
}

#[test]
fn test_register_invalid_registration() {
    let devices = Arc::new(MockDeviceStore::default());
    let queue = Arc::new(MockDownlinkQueue::default());
    let handler = make_handler(Arc::clone(&devices), Arc::clone(&queue));
    let mut an = MockAckNacker::default();
    let mut sub = MockSubscriber::default();
    let mut reg = registration();
    reg.recipient.clear();

    let err = handler.register(&reg, &mut an, &mut sub).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Structural);
    assert!(devices.in_store.lock().unwrap().is_none());
    assert!(sub.in_subscribe.is_none());
}

#[test]
fn test_register_store_failure() {
    let devices = Arc::new(MockDeviceStore {
        fail_store: Some(Error::Operational("store down".to_string())),
        ..Default::default()
    });
    let queue = Arc::new(MockDownlinkQueue::default());
    let handler = make_handler(Arc::clone(&devices), Arc::clone(&queue));
    let mut an = MockAckNacker::default();
    let mut sub = MockSubscriber::default();
    let reg = registration();

    let err = handler.register(&reg, &mut an, &mut sub).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Operational);
    // The store saw the registration before failing
    assert_eq!(*devices.in_store.lock().unwrap(), Some(reg));
    assert!(sub.in_subscribe.is_none());
}

// ---------------------------------------------------------- handle_down

#[test]
fn test_handle_down_valid_packet() {
    let devices = Arc::new(MockDeviceStore::default());
    let queue = Arc::new(MockDownlinkQueue::default());
    let handler = make_handler(Arc::clone(&devices), Arc::clone(&queue));
    let adapter = Arc::new(MockAdapter::default());
    let mut an = MockAckNacker::default();
    let packet = AppPacket {
        app_eui: app_eui(),
        dev_eui: dev_eui(),
        payload: b"TheThingsNetwork".to_vec(),
        metadata: vec![],
    };
    let data = packet.to_bytes().unwrap();

    handler
        .handle_down(&data, &mut an, Arc::clone(&adapter) as Arc<dyn GatewayAdapter>)
        .unwrap();

    assert_eq!(*queue.in_push.lock().unwrap(), Some(packet));
    assert_eq!(an.in_ack, Some(None));
    assert!(adapter.in_send_packet.lock().unwrap().is_none());
    assert!(adapter.in_send_recipients.lock().unwrap().is_none());
}

#[test]
fn test_handle_down_garbage() {
    let devices = Arc::new(MockDeviceStore::default());
    let queue = Arc::new(MockDownlinkQueue::default());
    let handler = make_handler(Arc::clone(&devices), Arc::clone(&queue));
    let mut an = MockAckNacker::default();

    let err = handler
        .handle_down(&[1, 2, 3], &mut an, Arc::new(MockAdapter::default()))
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Structural);
    assert!(queue.in_push.lock().unwrap().is_none());
    assert!(an.in_ack.is_none());
}

#[test]
fn test_handle_down_wrong_packet_type() {
    let devices = Arc::new(MockDeviceStore::default());
    let queue = Arc::new(MockDownlinkQueue::default());
    let handler = make_handler(Arc::clone(&devices), Arc::clone(&queue));
    let mut an = MockAckNacker::default();
    let join = JoinPacket {
        app_eui: app_eui(),
        dev_eui: dev_eui(),
        dev_nonce: [14, 42],
        metadata: Metadata::default(),
    };

    let err = handler
        .handle_down(
            &join.to_bytes().unwrap(),
            &mut an,
            Arc::new(MockAdapter::default()),
        )
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Implementation);
    assert!(queue.in_push.lock().unwrap().is_none());
    assert!(an.in_ack.is_none());
}

#[test]
fn test_handle_down_push_failure() {
    let devices = Arc::new(MockDeviceStore::default());
    let queue = Arc::new(MockDownlinkQueue {
        fail_push: Some(Error::Operational("queue down".to_string())),
        ..Default::default()
    });
    let handler = make_handler(Arc::clone(&devices), Arc::clone(&queue));
    let mut an = MockAckNacker::default();
    let packet = AppPacket {
        app_eui: app_eui(),
        dev_eui: dev_eui(),
        payload: b"TheThingsNetwork".to_vec(),
        metadata: vec![],
    };

    let err = handler
        .handle_down(
            &packet.to_bytes().unwrap(),
            &mut an,
            Arc::new(MockAdapter::default()),
        )
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Operational);
    assert!(an.in_ack.is_none());
}

// ------------------------------------------------------------ handle_up

#[test]
fn test_handle_up_unknown_device() {
    let devices = Arc::new(MockDeviceStore::default());
    let queue = Arc::new(MockDownlinkQueue::default());
    let handler = make_handler(Arc::clone(&devices), Arc::clone(&queue));
    let adapter = Arc::new(MockAdapter::default());
    let mut an = MockAckNacker::default();
    let data = uplink_frame(b"Payload", meta(Some(5), Some(-25)), 10);

    let err = handler
        .handle_up(&data, &mut an, Arc::clone(&adapter) as Arc<dyn GatewayAdapter>)
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Behavioural);
    assert!(an.in_ack.is_none());
    assert!(adapter.in_send_packet.lock().unwrap().is_none());
}

#[test]
fn test_handle_up_garbage() {
    let devices = Arc::new(MockDeviceStore::default());
    let queue = Arc::new(MockDownlinkQueue::default());
    let handler = make_handler(Arc::clone(&devices), Arc::clone(&queue));
    let mut an = MockAckNacker::default();

    let err = handler
        .handle_up(&[1, 2, 3], &mut an, Arc::new(MockAdapter::default()))
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Structural);
    assert!(an.in_ack.is_none());
}

#[test]
fn test_handle_up_wrong_packet_type() {
    let devices = Arc::new(MockDeviceStore::default());
    let queue = Arc::new(MockDownlinkQueue::default());
    let handler = make_handler(Arc::clone(&devices), Arc::clone(&queue));
    let mut an = MockAckNacker::default();
    let join = JoinPacket {
        app_eui: app_eui(),
        dev_eui: dev_eui(),
        dev_nonce: [14, 42],
        metadata: Metadata::default(),
    };

    let err = handler
        .handle_up(
            &join.to_bytes().unwrap(),
            &mut an,
            Arc::new(MockAdapter::default()),
        )
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Implementation);
    assert!(an.in_ack.is_none());
}

#[test]
fn test_handle_up_single_copy_no_downlink() {
    let devices = Arc::new(MockDeviceStore {
        out_lookup: Some(device_entry()),
        ..Default::default()
    });
    let queue = Arc::new(MockDownlinkQueue::default());
    let handler = make_handler(Arc::clone(&devices), Arc::clone(&queue));
    let adapter = Arc::new(MockAdapter::default());
    let mut an = MockAckNacker::default();
    let metadata = meta(Some(5), Some(-25));
    let data = uplink_frame(b"Payload", metadata.clone(), 10);

    handler
        .handle_up(&data, &mut an, Arc::clone(&adapter) as Arc<dyn GatewayAdapter>)
        .unwrap();

    assert_eq!(an.in_ack, Some(None));
    let delivered = AppPacket {
        app_eui: app_eui(),
        dev_eui: dev_eui(),
        payload: b"Payload".to_vec(),
        metadata: vec![metadata],
    };
    assert_eq!(*adapter.in_send_packet.lock().unwrap(), Some(delivered));
    assert_eq!(
        *adapter.in_send_recipients.lock().unwrap(),
        Some(vec![Recipient::new(b"app-endpoint".to_vec())])
    );
    assert!(queue.in_push.lock().unwrap().is_none());
}

#[test]
fn test_handle_up_no_metadata() {
    let devices = Arc::new(MockDeviceStore {
        out_lookup: Some(device_entry()),
        ..Default::default()
    });
    let queue = Arc::new(MockDownlinkQueue::default());
    let handler = make_handler(Arc::clone(&devices), Arc::clone(&queue));
    let adapter = Arc::new(MockAdapter::default());
    let mut an = MockAckNacker::default();
    let data = uplink_frame(b"Payload", Metadata::default(), 10);

    handler
        .handle_up(&data, &mut an, Arc::clone(&adapter) as Arc<dyn GatewayAdapter>)
        .unwrap();

    assert_eq!(an.in_ack, Some(None));
    let delivered = adapter.in_send_packet.lock().unwrap().clone().unwrap();
    assert_eq!(delivered.payload, b"Payload");
    assert_eq!(delivered.metadata, vec![Metadata::default()]);
}

#[test]
fn test_handle_up_two_copies_in_window() {
    let devices = Arc::new(MockDeviceStore {
        out_lookup: Some(device_entry()),
        ..Default::default()
    });
    let queue = Arc::new(MockDownlinkQueue::default());
    let handler = make_handler(Arc::clone(&devices), Arc::clone(&queue));

    let meta1 = meta(Some(75), Some(-25));
    let meta2 = meta(Some(5), Some(0));
    let data1 = uplink_frame(b"Payload", meta1.clone(), 10);
    let data2 = uplink_frame(b"Payload", meta2.clone(), 10);

    let adapter1 = Arc::new(MockAdapter::default());
    let adapter2 = Arc::new(MockAdapter::default());

    let first = {
        let handler = Arc::clone(&handler);
        let adapter = Arc::clone(&adapter1);
        thread::spawn(move || {
            let mut an = MockAckNacker::default();
            handler.handle_up(&data1, &mut an, adapter).unwrap();
            assert_eq!(an.in_ack, Some(None));
        })
    };
    let second = {
        let handler = Arc::clone(&handler);
        let adapter = Arc::clone(&adapter2);
        thread::spawn(move || {
            // Arrive well inside the first copy's collection window.
            thread::sleep(Duration::from_millis(50));
            let mut an = MockAckNacker::default();
            handler.handle_up(&data2, &mut an, adapter).unwrap();
            assert_eq!(an.in_ack, Some(None));
        })
    };
    first.join().unwrap();
    second.join().unwrap();

    // Only the best copy's adapter carried the delivery, with both
    // metadata entries in arrival order.
    assert!(adapter1.in_send_packet.lock().unwrap().is_none());
    let delivered = AppPacket {
        app_eui: app_eui(),
        dev_eui: dev_eui(),
        payload: b"Payload".to_vec(),
        metadata: vec![meta1, meta2],
    };
    assert_eq!(*adapter2.in_send_packet.lock().unwrap(), Some(delivered));
    assert_eq!(
        *adapter2.in_send_recipients.lock().unwrap(),
        Some(vec![Recipient::new(b"app-endpoint".to_vec())])
    );

    let stats = handler.stats();
    assert_eq!(stats.uplinks_submitted, 2);
    assert_eq!(stats.bundles_dispatched, 1);
    assert_eq!(stats.duplicates_collated, 1);
}

#[test]
fn test_handle_up_with_pending_downlink() {
    let devices = Arc::new(MockDeviceStore {
        out_lookup: Some(device_entry()),
        ..Default::default()
    });
    let queue = Arc::new(MockDownlinkQueue::default());
    *queue.out_pull.lock().unwrap() = Some(AppPacket {
        app_eui: app_eui(),
        dev_eui: dev_eui(),
        payload: b"Downlink".to_vec(),
        metadata: vec![],
    });
    let handler = make_handler(Arc::clone(&devices), Arc::clone(&queue));
    let adapter = Arc::new(MockAdapter::default());
    let mut an = MockAckNacker::default();
    let metadata = meta(Some(5), Some(-25));
    let data = uplink_frame(b"Payload", metadata.clone(), 10);

    handler
        .handle_up(&data, &mut an, Arc::clone(&adapter) as Arc<dyn GatewayAdapter>)
        .unwrap();

    // The reply frame answers on the next frame counter, encrypted and
    // MIC'd for the device.
    let crypto = session_crypto();
    let payload = crypto.encrypt_downlink(11, b"Downlink");
    let mic = crypto.compute_mic(Direction::Down, 11, &payload).unwrap();
    let expected = DownlinkPacket {
        dev_addr: dev_addr(),
        payload,
        metadata: Metadata::default(),
        fcnt: 11,
        mic,
    };
    assert_eq!(an.in_ack, Some(Some(expected)));

    // The uplink delivery still went out
    let delivered = adapter.in_send_packet.lock().unwrap().clone().unwrap();
    assert_eq!(delivered.payload, b"Payload");
    assert_eq!(delivered.metadata, vec![metadata]);
}

#[test]
fn test_handle_up_late_duplicate() {
    let devices = Arc::new(MockDeviceStore {
        out_lookup: Some(device_entry()),
        ..Default::default()
    });
    let queue = Arc::new(MockDownlinkQueue::default());
    let handler = make_handler(Arc::clone(&devices), Arc::clone(&queue));

    let data = uplink_frame(b"Payload", meta(Some(5), Some(-25)), 10);
    let adapter1 = Arc::new(MockAdapter::default());
    let adapter2 = Arc::new(MockAdapter::default());

    let first = {
        let handler = Arc::clone(&handler);
        let adapter = Arc::clone(&adapter1);
        let data = data.clone();
        thread::spawn(move || {
            let mut an = MockAckNacker::default();
            handler.handle_up(&data, &mut an, adapter).unwrap();
            assert_eq!(an.in_ack, Some(None));
        })
    };
    let second = {
        let handler = Arc::clone(&handler);
        let adapter = Arc::clone(&adapter2);
        thread::spawn(move || {
            // Twice the collection window: the bundle has closed.
            thread::sleep(Duration::from_millis(200));
            let mut an = MockAckNacker::default();
            let err = handler.handle_up(&data, &mut an, adapter).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Operational);
            assert!(an.in_ack.is_none());
        })
    };
    first.join().unwrap();
    second.join().unwrap();

    assert!(adapter1.in_send_packet.lock().unwrap().is_some());
    assert!(adapter2.in_send_packet.lock().unwrap().is_none());
    assert_eq!(handler.stats().late_rejections, 1);
}

#[test]
fn test_handle_up_send_failure() {
    let devices = Arc::new(MockDeviceStore {
        out_lookup: Some(device_entry()),
        ..Default::default()
    });
    let queue = Arc::new(MockDownlinkQueue::default());
    let handler = make_handler(Arc::clone(&devices), Arc::clone(&queue));
    let adapter = Arc::new(MockAdapter {
        fail_send: Some(Error::Operational("unable to send".to_string())),
        ..Default::default()
    });
    let mut an = MockAckNacker::default();
    let metadata = meta(Some(5), Some(-25));
    let data = uplink_frame(b"Payload", metadata.clone(), 10);

    let err = handler
        .handle_up(&data, &mut an, Arc::clone(&adapter) as Arc<dyn GatewayAdapter>)
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Operational);
    assert!(an.in_ack.is_none());
    // The attempted packet is still observable
    let attempted = AppPacket {
        app_eui: app_eui(),
        dev_eui: dev_eui(),
        payload: b"Payload".to_vec(),
        metadata: vec![metadata],
    };
    assert_eq!(*adapter.in_send_packet.lock().unwrap(), Some(attempted));
}

#[test]
fn test_handle_up_get_recipient_failure() {
    let devices = Arc::new(MockDeviceStore {
        out_lookup: Some(device_entry()),
        ..Default::default()
    });
    let queue = Arc::new(MockDownlinkQueue::default());
    let handler = make_handler(Arc::clone(&devices), Arc::clone(&queue));
    let adapter = Arc::new(MockAdapter {
        fail_get_recipient: Some(Error::Operational("unable to resolve".to_string())),
        ..Default::default()
    });
    let mut an = MockAckNacker::default();
    let data = uplink_frame(b"Payload", meta(Some(5), Some(-25)), 10);

    let err = handler
        .handle_up(&data, &mut an, Arc::clone(&adapter) as Arc<dyn GatewayAdapter>)
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Operational);
    assert!(an.in_ack.is_none());
    assert!(adapter.in_send_packet.lock().unwrap().is_none());
}

#[test]
fn test_handle_up_pull_failure() {
    let devices = Arc::new(MockDeviceStore {
        out_lookup: Some(device_entry()),
        ..Default::default()
    });
    let queue = Arc::new(MockDownlinkQueue {
        fail_pull: Some(Error::Operational("unable to pull".to_string())),
        ..Default::default()
    });
    let handler = make_handler(Arc::clone(&devices), Arc::clone(&queue));
    let adapter = Arc::new(MockAdapter::default());
    let mut an = MockAckNacker::default();
    let metadata = meta(Some(5), Some(-25));
    let data = uplink_frame(b"Payload", metadata.clone(), 10);

    let err = handler
        .handle_up(&data, &mut an, Arc::clone(&adapter) as Arc<dyn GatewayAdapter>)
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Operational);
    assert!(an.in_ack.is_none());
    // The uplink delivery was attempted before the queue failed
    let attempted = AppPacket {
        app_eui: app_eui(),
        dev_eui: dev_eui(),
        payload: b"Payload".to_vec(),
        metadata: vec![metadata],
    };
    assert_eq!(*adapter.in_send_packet.lock().unwrap(), Some(attempted));
}
