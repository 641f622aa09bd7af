use std::collections::{HashMap, VecDeque};

use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, trace, warn};

use crate::core::{Config, Error, ProtocolError, Result, Uid};
use crate::network::Radio;
use super::codec;
use super::packet::Packet;
use super::registry::{DeviceType, EventType, Revision};
use super::slot::{DeviceDescriptor, StateSlot};

/// Protocol state of one device, as seen by its role machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// Nothing outstanding
    Idle,

    /// Gateway sent a request and waits for the answer
    AwaitingResponse {
        /// Request that was sent
        event: EventType,
        /// When it was sent
        sent_at: Instant,
    },

    /// Peripheral is building its reply to a request
    Responding {
        /// Request being answered
        event: EventType,
    },
}

/// A request waiting for its response
#[derive(Debug, Clone, Copy)]
pub struct PendingRequest {
    /// Request that was sent
    pub event: EventType,
    /// When it was sent
    pub sent_at: Instant,
    /// When it is reported as not responding
    pub deadline: Instant,
}

/// Successful answer to a gateway request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Request accepted, with the device's current state
    Ok(Vec<StateSlot>),
    /// Answer to a ping
    Pong,
    /// Devices found by a scan
    Devices(Vec<DeviceDescriptor>),
}

/// Terminal outcome of one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Target the request was sent to
    pub uid: Uid,
    /// Request that completed
    pub event: EventType,
    /// Response, or the error the request ended with
    pub outcome: std::result::Result<Response, ProtocolError>,
}

/// Gateway role: issues requests and matches the responses to them
///
/// At most one request per target uid is outstanding at a time. Requests to
/// different uids are multiplexed; their completions are delivered in the order
/// they happen.
pub struct Gateway<R> {
    /// Link to the mesh
    radio: R,
    /// Configuration
    config: Config,
    /// Outstanding requests keyed by target
    pending: HashMap<Uid, PendingRequest>,
    /// Completions not yet collected
    completed: VecDeque<Completion>,
    /// Devices heard from so far
    devices: HashMap<Uid, DeviceType>,
}

impl<R: Radio> Gateway<R> {
    /// Creates a gateway speaking `config.revision` over `radio`
    pub fn new(radio: R, config: Config) -> Result<Self> {
        config.validate()?;

        Ok(Gateway {
            radio,
            config,
            pending: HashMap::new(),
            completed: VecDeque::new(),
            devices: HashMap::new(),
        })
    }

    /// Revision spoken by this gateway
    pub fn revision(&self) -> Revision {
        self.config.revision
    }

    /// State of the exchange with `uid`
    pub fn state(&self, uid: Uid) -> NodeState {
        match self.pending.get(&uid) {
            Some(pending) => NodeState::AwaitingResponse {
                event: pending.event,
                sent_at: pending.sent_at,
            },
            None => NodeState::Idle,
        }
    }

    /// The request outstanding for `uid`, if any
    pub fn pending(&self, uid: Uid) -> Option<&PendingRequest> {
        self.pending.get(&uid)
    }

    /// Number of outstanding requests
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Every device heard from so far, ordered by uid
    pub fn known_devices(&self) -> Vec<DeviceDescriptor> {
        let mut devices: Vec<_> = self
            .devices
            .iter()
            .map(|(uid, device_type)| DeviceDescriptor { uid: *uid, device_type: *device_type })
            .collect();
        devices.sort_by_key(|device| device.uid);
        devices
    }

    /// Sends a request without waiting for its response
    ///
    /// Moves `uid` from `Idle` to `AwaitingResponse`. Fails if a request to
    /// `uid` is already outstanding.
    pub async fn send_request(
        &mut self,
        uid: Uid,
        event: EventType,
        slots: impl IntoIterator<Item = StateSlot>,
    ) -> Result<()> {
        if !event.is_request() {
            return Err(Error::invalid_state(format!("{:?} is not a request", event)));
        }
        if self.pending.contains_key(&uid) {
            return Err(Error::invalid_state(format!("request to {} already outstanding", uid)));
        }
        if self.pending.len() >= self.config.max_pending {
            return Err(Error::invalid_state(format!(
                "{} requests already outstanding",
                self.pending.len()
            )));
        }

        let packet = Packet::new(self.config.revision, uid, DeviceType::Gateway, event, slots)?;
        let frame = codec::encode(&packet);
        if let Err(e) = self.radio.send(&frame).await {
            warn!(%uid, ?event, error = %e, "failed to transmit request");
            return Err(ProtocolError::RadioError.into());
        }

        let sent_at = Instant::now();
        self.pending.insert(uid, PendingRequest {
            event,
            sent_at,
            deadline: sent_at + self.config.response_timeout,
        });
        debug!(%uid, ?event, "request sent");
        Ok(())
    }

    /// Abandons the request outstanding for `uid`
    ///
    /// Nothing is sent to the device. Returns whether a request was pending.
    pub fn cancel(&mut self, uid: Uid) -> bool {
        let cancelled = self.pending.remove(&uid).is_some();
        if cancelled {
            debug!(%uid, "request cancelled");
        }
        cancelled
    }

    /// Matches a received packet against the outstanding requests
    pub fn handle_packet(&mut self, packet: &Packet) -> Option<Completion> {
        if packet.device_type() == DeviceType::Gateway {
            trace!(uid = %packet.uid(), "ignoring gateway packet");
            return None;
        }
        self.record_devices(packet);

        let uid = packet.uid();
        let revision = self.config.revision;
        let event = packet.event();
        let own = self.pending.get(&uid).map(|p| p.event);
        let scan_pending = self.pending.get(&Uid::BROADCAST).map(|p| p.event) == Some(EventType::Scan);

        let target = match own {
            Some(request) if pairs_with(revision, request, event) => uid,
            // A device's own request takes precedence; errors never answer a broadcast
            _ if scan_pending
                && event != EventType::Error
                && pairs_with(revision, EventType::Scan, event) => Uid::BROADCAST,
            Some(_) => uid,
            None => {
                debug!(%uid, ?event, "unsolicited packet");
                return None;
            }
        };

        let request = self.pending.remove(&target)?;
        let outcome = interpret(revision, request.event, packet);
        match &outcome {
            Ok(_) => debug!(uid = %target, event = ?request.event, "request completed"),
            Err(e) => info!(uid = %target, event = ?request.event, error = %e, "request failed"),
        }

        Some(Completion {
            uid: target,
            event: request.event,
            outcome,
        })
    }

    /// Fails every request whose deadline has passed with `NodeNotResponding`
    pub fn expire(&mut self, now: Instant) -> Vec<Completion> {
        let mut expired: Vec<Uid> = self
            .pending
            .iter()
            .filter(|(_, pending)| pending.deadline <= now)
            .map(|(uid, _)| *uid)
            .collect();
        expired.sort();

        expired
            .into_iter()
            .filter_map(|uid| {
                let pending = self.pending.remove(&uid)?;
                info!(%uid, event = ?pending.event, "node not responding");
                Some(Completion {
                    uid,
                    event: pending.event,
                    outcome: Err(ProtocolError::NodeNotResponding),
                })
            })
            .collect()
    }

    /// Waits for the next request to complete
    ///
    /// Returns `None` when nothing is outstanding.
    pub async fn next_completion(&mut self) -> Option<Completion> {
        loop {
            if let Some(completion) = self.completed.pop_front() {
                return Some(completion);
            }
            if self.pending.is_empty() {
                return None;
            }

            let done = self.drive().await;
            self.completed.extend(done);
        }
    }

    /// Sends a request and waits for its outcome
    ///
    /// Completions of other targets that arrive meanwhile are kept for
    /// [`Gateway::next_completion`].
    pub async fn request(
        &mut self,
        uid: Uid,
        event: EventType,
        slots: impl IntoIterator<Item = StateSlot>,
    ) -> Result<Response> {
        self.send_request(uid, event, slots).await?;

        loop {
            let mut found = None;
            for completion in self.drive().await {
                if found.is_none() && completion.uid == uid {
                    found = Some(completion);
                } else {
                    self.completed.push_back(completion);
                }
            }

            if let Some(completion) = found {
                return completion.outcome.map_err(Error::from);
            }
        }
    }

    /// Checks that `uid` is reachable
    pub async fn ping(&mut self, uid: Uid) -> Result<()> {
        self.request(uid, EventType::Ping, []).await.map(|_| ())
    }

    /// Reads the state of `uid`
    pub async fn get_state(&mut self, uid: Uid) -> Result<Vec<StateSlot>> {
        match self.request(uid, EventType::GetState, []).await? {
            Response::Ok(slots) => Ok(slots),
            _ => Err(ProtocolError::GatewayWrongResponse.into()),
        }
    }

    /// Changes the state of `uid`, returning the state it reports afterwards
    pub async fn set_state(
        &mut self,
        uid: Uid,
        slots: impl IntoIterator<Item = StateSlot>,
    ) -> Result<Vec<StateSlot>> {
        match self.request(uid, EventType::SetState, slots).await? {
            Response::Ok(slots) => Ok(slots),
            _ => Err(ProtocolError::GatewayWrongResponse.into()),
        }
    }

    /// Broadcasts a scan and returns the first answer's devices
    pub async fn scan(&mut self) -> Result<Vec<DeviceDescriptor>> {
        match self.request(Uid::BROADCAST, EventType::Scan, []).await? {
            Response::Devices(devices) => Ok(devices),
            _ => Err(ProtocolError::GatewayWrongResponse.into()),
        }
    }

    /// Waits for one frame or the earliest deadline and returns what completed
    async fn drive(&mut self) -> Vec<Completion> {
        let expired = self.expire(Instant::now());
        if !expired.is_empty() {
            return expired;
        }
        let Some(deadline) = self.pending.values().map(|p| p.deadline).min() else {
            return Vec::new();
        };

        match timeout_at(deadline, self.radio.receive()).await {
            Ok(Some(frame)) => match codec::decode(self.config.revision, &frame) {
                Ok(packet) => self.handle_packet(&packet).into_iter().collect(),
                Err(e) => {
                    debug!(error = %e, "dropping undecodable frame");
                    Vec::new()
                }
            },
            Ok(None) => {
                warn!("radio link closed, failing outstanding requests");
                self.fail_all(ProtocolError::RadioError)
            }
            Err(_) => self.expire(Instant::now()),
        }
    }

    fn fail_all(&mut self, error: ProtocolError) -> Vec<Completion> {
        let mut failed: Vec<Completion> = self
            .pending
            .drain()
            .map(|(uid, pending)| Completion {
                uid,
                event: pending.event,
                outcome: Err(error),
            })
            .collect();
        failed.sort_by_key(|completion| completion.uid);
        failed
    }

    fn record_devices(&mut self, packet: &Packet) {
        let sender = packet.sender();
        let descriptors = packet.states().filter_map(|slot| match slot {
            StateSlot::Device(descriptor) => Some(*descriptor),
            _ => None,
        });

        for device in std::iter::once(sender).chain(descriptors) {
            if self.devices.insert(device.uid, device.device_type) != Some(device.device_type) {
                info!(uid = %device.uid, device_type = ?device.device_type, "device discovered");
            }
        }
    }
}

/// Returns whether `reply` is an expected answer to `request`
///
/// Revisions without `Devices` answer a scan with `Pong`.
fn pairs_with(revision: Revision, request: EventType, reply: EventType) -> bool {
    match (request, reply) {
        (_, EventType::Error)
        | (EventType::Ping, EventType::Pong)
        | (EventType::Scan, EventType::Devices)
        | (EventType::GetState | EventType::SetState, EventType::Ok) => true,
        (EventType::Scan, EventType::Pong) => !revision.registry().supports(EventType::Devices),
        _ => false,
    }
}

/// Maps the response to `request` onto its outcome
fn interpret(
    revision: Revision,
    request: EventType,
    packet: &Packet,
) -> std::result::Result<Response, ProtocolError> {
    match (request, packet.event()) {
        (_, EventType::Error) => Err(packet
            .states()
            .find_map(|slot| match slot {
                StateSlot::ErrorCode(code) => Some(ProtocolError::from(*code)),
                _ => None,
            })
            .unwrap_or(ProtocolError::Unspecified)),
        (EventType::Ping, EventType::Pong) => Ok(Response::Pong),
        (EventType::Scan, EventType::Devices) => {
            let mut devices: Vec<DeviceDescriptor> = packet
                .states()
                .filter_map(|slot| match slot {
                    StateSlot::Device(descriptor) => Some(*descriptor),
                    _ => None,
                })
                .collect();
            if devices.is_empty() {
                devices.push(packet.sender());
            }
            Ok(Response::Devices(devices))
        }
        (EventType::Scan, EventType::Pong) if pairs_with(revision, request, EventType::Pong) => {
            Ok(Response::Devices(vec![packet.sender()]))
        }
        (EventType::GetState | EventType::SetState, EventType::Ok) => {
            Ok(Response::Ok(packet.states().copied().collect()))
        }
        _ => Err(ProtocolError::GatewayWrongResponse),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use crate::device::{SimulatedOutlet, SimulatedStation};
    use crate::network::{ChannelRadio, Medium};
    use crate::protocol::peripheral::Peripheral;
    use crate::protocol::registry::ErrorCode;

    fn config(revision: Revision) -> Config {
        Config {
            revision,
            response_timeout: Duration::from_millis(100),
            ..Config::default()
        }
    }

    fn reply(revision: Revision, uid: u8, device_type: DeviceType, event: EventType, slots: Vec<StateSlot>) -> Packet {
        Packet::new(revision, Uid(uid), device_type, event, slots).unwrap()
    }

    fn spawn_outlet(medium: &Medium, uid: u8, revision: Revision) -> SimulatedOutlet {
        let outlet = SimulatedOutlet::new();
        let mut peripheral = Peripheral::new(Uid(uid), revision, outlet.clone()).unwrap();
        let mut radio = medium.attach();
        tokio::spawn(async move { peripheral.serve(&mut radio).await });
        outlet
    }

    #[tokio::test]
    async fn test_set_state_clears_pending() {
        let medium = Medium::new(32);
        let mut gateway = Gateway::new(medium.attach(), config(Revision::V3)).unwrap();
        let outlet = spawn_outlet(&medium, 5, Revision::V3);

        let state = gateway.set_state(Uid(5), [StateSlot::OnOff(true)]).await.unwrap();

        assert_eq!(state, vec![StateSlot::OnOff(true)]);
        assert!(outlet.is_on());
        assert_eq!(gateway.state(Uid(5)), NodeState::Idle);
        assert_eq!(gateway.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_silent_node_is_not_responding() {
        let medium = Medium::new(32);
        let _silent = medium.attach();
        let mut gateway = Gateway::new(medium.attach(), config(Revision::V3)).unwrap();

        let started = Instant::now();
        let result = gateway.get_state(Uid(7)).await;

        assert!(matches!(result, Err(Error::Protocol(ProtocolError::NodeNotResponding))));
        assert!(started.elapsed() >= Duration::from_millis(100));
        assert_eq!(gateway.state(Uid(7)), NodeState::Idle);
    }

    #[tokio::test]
    async fn test_repeated_get_state_is_identical() {
        let medium = Medium::new(32);
        let station = SimulatedStation::new();
        station.set_soil_moisture(480);
        let mut peripheral = Peripheral::new(Uid(7), Revision::V2, station.clone()).unwrap();
        let mut radio = medium.attach();
        tokio::spawn(async move { peripheral.serve(&mut radio).await });

        let mut gateway = Gateway::new(medium.attach(), config(Revision::V2)).unwrap();
        let first = gateway.request(Uid(7), EventType::GetState, []).await.unwrap();
        let second = gateway.request(Uid(7), EventType::GetState, []).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(
            first,
            Response::Ok(vec![StateSlot::OnOff(false), StateSlot::SoilMoisture(480)])
        );
    }

    #[tokio::test]
    async fn test_scan_discovers_device() {
        let medium = Medium::new(32);
        let mut gateway = Gateway::new(medium.attach(), config(Revision::V3)).unwrap();
        spawn_outlet(&medium, 12, Revision::V3);

        let devices = gateway.scan().await.unwrap();
        let outlet = DeviceDescriptor { uid: Uid(12), device_type: DeviceType::Outlet };
        assert_eq!(devices, vec![outlet]);
        assert_eq!(gateway.known_devices(), vec![outlet]);
    }

    #[tokio::test]
    async fn test_scan_without_discovery_event() {
        let medium = Medium::new(32);
        let mut gateway = Gateway::new(medium.attach(), config(Revision::V1)).unwrap();
        spawn_outlet(&medium, 3, Revision::V1);

        let devices = gateway.scan().await.unwrap();
        assert_eq!(devices, vec![DeviceDescriptor { uid: Uid(3), device_type: DeviceType::Outlet }]);
    }

    #[tokio::test]
    async fn test_scan_alongside_addressed_request() {
        let medium = Medium::new(32);
        let mut gateway = Gateway::new(medium.attach(), config(Revision::V3)).unwrap();
        spawn_outlet(&medium, 5, Revision::V3);

        gateway.send_request(Uid::BROADCAST, EventType::Scan, []).await.unwrap();
        gateway.send_request(Uid(5), EventType::GetState, []).await.unwrap();

        let mut completions = vec![
            gateway.next_completion().await.unwrap(),
            gateway.next_completion().await.unwrap(),
        ];
        completions.sort_by_key(|completion| completion.uid);

        assert_eq!(completions[0].uid, Uid(5));
        assert_eq!(completions[0].outcome, Ok(Response::Ok(vec![StateSlot::OnOff(false)])));
        assert_eq!(completions[1].uid, Uid::BROADCAST);
        assert_eq!(
            completions[1].outcome,
            Ok(Response::Devices(vec![DeviceDescriptor { uid: Uid(5), device_type: DeviceType::Outlet }]))
        );
    }

    #[tokio::test]
    async fn test_scan_answer_routed_past_other_request() {
        let medium = Medium::new(32);
        let mut gateway = Gateway::new(medium.attach(), config(Revision::V3)).unwrap();
        gateway.send_request(Uid::BROADCAST, EventType::Scan, []).await.unwrap();
        gateway.send_request(Uid(5), EventType::GetState, []).await.unwrap();

        let outlet = DeviceDescriptor { uid: Uid(5), device_type: DeviceType::Outlet };
        let devices = reply(Revision::V3, 5, DeviceType::Outlet, EventType::Devices, vec![StateSlot::Device(outlet)]);
        let completion = gateway.handle_packet(&devices).unwrap();

        assert_eq!(completion.uid, Uid::BROADCAST);
        assert_eq!(completion.outcome, Ok(Response::Devices(vec![outlet])));
        assert!(matches!(gateway.state(Uid(5)), NodeState::AwaitingResponse { event: EventType::GetState, .. }));
    }

    #[tokio::test]
    async fn test_late_pong_does_not_answer_scan() {
        let medium = Medium::new(32);
        let mut gateway = Gateway::new(medium.attach(), config(Revision::V3)).unwrap();
        gateway.send_request(Uid::BROADCAST, EventType::Scan, []).await.unwrap();

        let pong = reply(Revision::V3, 4, DeviceType::Outlet, EventType::Pong, vec![]);
        assert!(gateway.handle_packet(&pong).is_none());
        assert!(matches!(gateway.state(Uid::BROADCAST), NodeState::AwaitingResponse { event: EventType::Scan, .. }));

        // Revisions without Devices still answer a scan with Pong
        let mut older = Gateway::new(medium.attach(), config(Revision::V2)).unwrap();
        older.send_request(Uid::BROADCAST, EventType::Scan, []).await.unwrap();
        let pong = reply(Revision::V2, 4, DeviceType::Outlet, EventType::Pong, vec![]);
        let completion = older.handle_packet(&pong).unwrap();
        assert_eq!(
            completion.outcome,
            Ok(Response::Devices(vec![DeviceDescriptor { uid: Uid(4), device_type: DeviceType::Outlet }]))
        );
    }

    #[tokio::test]
    async fn test_error_from_other_device_leaves_scan_pending() {
        let medium = Medium::new(32);
        let mut gateway = Gateway::new(medium.attach(), config(Revision::V3)).unwrap();
        gateway.send_request(Uid::BROADCAST, EventType::Scan, []).await.unwrap();

        let error = reply(Revision::V3, 6, DeviceType::Outlet, EventType::Error, vec![]);
        assert!(gateway.handle_packet(&error).is_none());
        assert_eq!(gateway.pending_count(), 1);
    }

    #[tokio::test]
    async fn test_ping() {
        let medium = Medium::new(32);
        let mut gateway = Gateway::new(medium.attach(), config(Revision::V2)).unwrap();
        spawn_outlet(&medium, 4, Revision::V2);

        gateway.ping(Uid(4)).await.unwrap();
        assert!(matches!(
            gateway.ping(Uid(40)).await,
            Err(Error::Protocol(ProtocolError::NodeNotResponding))
        ));
    }

    #[tokio::test]
    async fn test_multiplexed_requests() {
        let medium = Medium::new(32);
        let mut gateway = Gateway::new(medium.attach(), config(Revision::V3)).unwrap();
        spawn_outlet(&medium, 5, Revision::V3);

        gateway.send_request(Uid(5), EventType::GetState, []).await.unwrap();
        gateway.send_request(Uid(9), EventType::GetState, []).await.unwrap();
        assert_eq!(gateway.pending_count(), 2);

        let first = gateway.next_completion().await.unwrap();
        assert_eq!(first.uid, Uid(5));
        assert_eq!(first.outcome, Ok(Response::Ok(vec![StateSlot::OnOff(false)])));

        let second = gateway.next_completion().await.unwrap();
        assert_eq!(second.uid, Uid(9));
        assert_eq!(second.outcome, Err(ProtocolError::NodeNotResponding));

        assert!(gateway.next_completion().await.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_request_rejected() {
        let medium = Medium::new(32);
        let mut gateway = Gateway::new(medium.attach(), config(Revision::V3)).unwrap();

        gateway.send_request(Uid(5), EventType::Ping, []).await.unwrap();
        let again = gateway.send_request(Uid(5), EventType::GetState, []).await;
        assert!(matches!(again, Err(Error::InvalidState(_))));

        let not_request = gateway.send_request(Uid(6), EventType::Ok, []).await;
        assert!(matches!(not_request, Err(Error::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_pending_limit() {
        let medium = Medium::new(32);
        let mut config = config(Revision::V3);
        config.max_pending = 1;
        let mut gateway = Gateway::new(medium.attach(), config).unwrap();

        gateway.send_request(Uid(1), EventType::Ping, []).await.unwrap();
        let second = gateway.send_request(Uid(2), EventType::Ping, []).await;
        assert!(matches!(second, Err(Error::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_cancel_discards_pending() {
        let medium = Medium::new(32);
        let mut peer = medium.attach();
        let mut gateway = Gateway::new(medium.attach(), config(Revision::V3)).unwrap();

        gateway.send_request(Uid(5), EventType::GetState, []).await.unwrap();
        assert!(matches!(gateway.state(Uid(5)), NodeState::AwaitingResponse { event: EventType::GetState, .. }));

        assert!(gateway.cancel(Uid(5)));
        assert!(!gateway.cancel(Uid(5)));
        assert_eq!(gateway.state(Uid(5)), NodeState::Idle);

        // Only the request itself went out
        let frame = peer.receive().await.unwrap();
        assert_eq!(codec::decode(Revision::V3, &frame).unwrap().event(), EventType::GetState);
        assert!(gateway.next_completion().await.is_none());
    }

    #[tokio::test]
    async fn test_error_response_surfaces_code() {
        let medium = Medium::new(32);
        let mut gateway = Gateway::new(medium.attach(), config(Revision::V3)).unwrap();
        gateway.send_request(Uid(5), EventType::SetState, [StateSlot::OnOff(true)]).await.unwrap();

        let error = reply(
            Revision::V3,
            5,
            DeviceType::Outlet,
            EventType::Error,
            vec![StateSlot::ErrorCode(ErrorCode::NodeNotConnected)],
        );
        let completion = gateway.handle_packet(&error).unwrap();
        assert_eq!(completion.outcome, Err(ProtocolError::NodeNotConnected));
    }

    #[tokio::test]
    async fn test_error_without_code() {
        let medium = Medium::new(32);
        let mut gateway = Gateway::new(medium.attach(), config(Revision::V1)).unwrap();
        gateway.send_request(Uid(5), EventType::GetState, []).await.unwrap();

        let error = reply(Revision::V1, 5, DeviceType::Outlet, EventType::Error, vec![]);
        let completion = gateway.handle_packet(&error).unwrap();
        assert_eq!(completion.outcome, Err(ProtocolError::Unspecified));
    }

    #[tokio::test]
    async fn test_wrong_response() {
        let medium = Medium::new(32);
        let mut gateway = Gateway::new(medium.attach(), config(Revision::V3)).unwrap();
        gateway.send_request(Uid(5), EventType::GetState, []).await.unwrap();

        let pong = reply(Revision::V3, 5, DeviceType::Outlet, EventType::Pong, vec![]);
        let completion = gateway.handle_packet(&pong).unwrap();
        assert_eq!(completion.outcome, Err(ProtocolError::GatewayWrongResponse));
        assert_eq!(gateway.state(Uid(5)), NodeState::Idle);
    }

    #[tokio::test]
    async fn test_unsolicited_and_gateway_packets_ignored() {
        let medium = Medium::new(32);
        let mut gateway = Gateway::new(medium.attach(), config(Revision::V3)).unwrap();
        gateway.send_request(Uid(5), EventType::GetState, []).await.unwrap();

        let other_gateway = reply(Revision::V3, 5, DeviceType::Gateway, EventType::Ok, vec![]);
        assert!(gateway.handle_packet(&other_gateway).is_none());

        let unsolicited = reply(Revision::V3, 8, DeviceType::Outlet, EventType::Ok, vec![]);
        assert!(gateway.handle_packet(&unsolicited).is_none());
        assert_eq!(gateway.pending_count(), 1);
        assert_eq!(
            gateway.known_devices(),
            vec![DeviceDescriptor { uid: Uid(8), device_type: DeviceType::Outlet }]
        );
    }

    #[tokio::test]
    async fn test_undecodable_frames_dropped() {
        let medium = Medium::new(32);
        let mut device = medium.attach();
        let mut gateway = Gateway::new(medium.attach(), config(Revision::V3)).unwrap();

        let responder = tokio::spawn(async move {
            let request = device.receive().await.unwrap();
            assert_eq!(request.len(), Revision::V3.frame_len());

            device.send(&[5, 2, 2]).await.unwrap();
            device.send(&[5, 9, 2, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]).await.unwrap();
            let ok = reply(Revision::V3, 5, DeviceType::Outlet, EventType::Ok, vec![StateSlot::OnOff(true)]);
            device.send(&codec::encode(&ok)).await.unwrap();
        });

        let state = gateway.get_state(Uid(5)).await.unwrap();
        assert_eq!(state, vec![StateSlot::OnOff(true)]);
        responder.await.unwrap();
    }

    #[tokio::test]
    async fn test_expire_only_overdue_requests() {
        let medium = Medium::new(32);
        let mut gateway = Gateway::new(medium.attach(), config(Revision::V3)).unwrap();
        gateway.send_request(Uid(5), EventType::Ping, []).await.unwrap();

        let deadline = gateway.pending(Uid(5)).unwrap().deadline;
        assert!(gateway.expire(deadline - Duration::from_millis(1)).is_empty());

        let expired = gateway.expire(deadline);
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].outcome, Err(ProtocolError::NodeNotResponding));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let medium = Medium::new(4);
        let mut config = Config::default();
        config.max_pending = 0;
        assert!(matches!(Gateway::<ChannelRadio>::new(medium.attach(), config), Err(Error::Config(_))));
    }
}
