//! # Bridge Client
//!
//! This module connects to the SDK bridge, which owns the radio link to the toys. Each connected
//! [`BridgeToy`] holds its own REQ socket, so the bridge can tell the toys apart by client.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::debug;

use toy_if::{
    bridge::{BridgeRequest, BridgeResponse},
    net::{zmq, NetParams, ReqClient},
    Acceleration, Color, Location, Scanner, Toy, ToyError, ToyInfo,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Discovers toys through the bridge.
pub struct BridgeScanner {
    ctx: zmq::Context,
    params: NetParams,
}

/// A toy connected through the bridge.
pub struct BridgeToy {
    client: ReqClient,
    name: String,
    connected: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl BridgeScanner {
    pub fn new(params: NetParams) -> Self {
        Self {
            ctx: zmq::Context::new(),
            params,
        }
    }

    fn client(&self) -> Result<ReqClient, ToyError> {
        Ok(ReqClient::new(
            &self.ctx,
            self.params.socket_options(),
            &self.params.bridge_endpoint
        )?)
    }
}

impl Scanner for BridgeScanner {
    type Toy = BridgeToy;

    fn find_toys(&self) -> Result<Vec<ToyInfo>, ToyError> {
        let mut client = self.client()?;

        let request = BridgeRequest::FindToys;
        let response: BridgeResponse = client.request(&request)?;

        match response.into_result(request.name())? {
            BridgeResponse::Toys { toys } => Ok(toys),
            r => Err(unexpected(request.name(), &r))
        }
    }

    fn connect(&self, info: &ToyInfo) -> Result<Self::Toy, ToyError> {
        let mut client = self.client()?;

        debug!("Requesting connection to {} via {}", info.name, client.endpoint());

        let request = BridgeRequest::Connect { name: info.name.clone() };
        let response: BridgeResponse = client.request(&request)
            .map_err(|e| ToyError::ConnectFailed {
                name: info.name.clone(),
                reason: e.to_string()
            })?;

        match response {
            BridgeResponse::Ok => Ok(BridgeToy {
                client,
                name: info.name.clone(),
                connected: true,
            }),
            BridgeResponse::Error { msg } => Err(ToyError::ConnectFailed {
                name: info.name.clone(),
                reason: msg
            }),
            r => Err(unexpected(request.name(), &r))
        }
    }
}

impl BridgeToy {
    /// Send a request and return the successful response.
    fn call(&mut self, request: BridgeRequest) -> Result<BridgeResponse, ToyError> {
        if !self.connected {
            return Err(ToyError::Disconnected);
        }

        // A roll is only answered once it has finished
        let extra_ms = match request {
            BridgeRequest::Roll { duration_s, .. } => (duration_s.max(0.0) * 1000.0) as i32,
            _ => 0
        };

        let response: BridgeResponse = self.client.request_with_extra_time(&request, extra_ms)?;
        response.into_result(request.name())
    }

    /// Send a request which has no return value.
    fn call_ok(&mut self, request: BridgeRequest) -> Result<(), ToyError> {
        let name = request.name();
        match self.call(request)? {
            BridgeResponse::Ok => Ok(()),
            r => Err(unexpected(name, &r))
        }
    }
}

impl Toy for BridgeToy {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_heading(&mut self, heading_deg: u16) -> Result<(), ToyError> {
        self.call_ok(BridgeRequest::SetHeading { heading_deg })
    }

    fn get_heading(&mut self) -> Result<u16, ToyError> {
        match self.call(BridgeRequest::GetHeading)? {
            BridgeResponse::Heading { heading_deg } => Ok(heading_deg % 360),
            r => Err(unexpected("get_heading", &r))
        }
    }

    fn set_speed(&mut self, speed: u8) -> Result<(), ToyError> {
        self.call_ok(BridgeRequest::SetSpeed { speed })
    }

    fn roll(&mut self, heading_deg: u16, speed: u8, duration_s: f64) -> Result<(), ToyError> {
        self.call_ok(BridgeRequest::Roll { heading_deg, speed, duration_s })
    }

    fn set_front_led(&mut self, color: Color) -> Result<(), ToyError> {
        self.call_ok(BridgeRequest::SetFrontLed { color })
    }

    fn set_back_led(&mut self, color: Color) -> Result<(), ToyError> {
        self.call_ok(BridgeRequest::SetBackLed { color })
    }

    fn set_main_led(&mut self, color: Color) -> Result<(), ToyError> {
        self.call_ok(BridgeRequest::SetMainLed { color })
    }

    fn set_matrix_character(&mut self, character: char, color: Color) -> Result<(), ToyError> {
        self.call_ok(BridgeRequest::SetMatrixCharacter { character, color })
    }

    fn set_stabilization(&mut self, enabled: bool) -> Result<(), ToyError> {
        self.call_ok(BridgeRequest::SetStabilization { enabled })
    }

    fn get_battery_voltage(&mut self) -> Result<f64, ToyError> {
        match self.call(BridgeRequest::GetBatteryVoltage)? {
            BridgeResponse::BatteryVoltage { volts } => Ok(volts),
            r => Err(unexpected("get_battery_voltage", &r))
        }
    }

    fn get_acceleration(&mut self) -> Result<Option<Acceleration>, ToyError> {
        match self.call(BridgeRequest::GetAcceleration)? {
            BridgeResponse::Acceleration { accel } => Ok(accel),
            r => Err(unexpected("get_acceleration", &r))
        }
    }

    fn get_location(&mut self) -> Result<Option<Location>, ToyError> {
        match self.call(BridgeRequest::GetLocation)? {
            BridgeResponse::Location { loc } => Ok(loc),
            r => Err(unexpected("get_location", &r))
        }
    }

    fn reset_locator(&mut self) -> Result<(), ToyError> {
        self.call_ok(BridgeRequest::ResetLocator)
    }

    fn start_calibration(&mut self) -> Result<(), ToyError> {
        self.call_ok(BridgeRequest::StartCalibration)
    }

    fn finish_calibration(&mut self) -> Result<(), ToyError> {
        self.call_ok(BridgeRequest::FinishCalibration)
    }

    fn disable_collision_detection(&mut self) -> Result<(), ToyError> {
        self.call_ok(BridgeRequest::DisableCollisionDetection)
    }

    fn disconnect(&mut self) -> Result<(), ToyError> {
        let result = self.call_ok(BridgeRequest::Disconnect);
        self.connected = false;
        result
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn unexpected(request: &str, response: &BridgeResponse) -> ToyError {
    ToyError::Comms(format!("unexpected reply to {}: {:?}", request, response))
}

#[cfg(test)]
mod test {
    use super::*;
    use std::thread;

    /// Serve the given canned responses on a REP socket, returning the requests received.
    fn serve(
        ctx: &zmq::Context,
        endpoint: &str,
        responses: Vec<BridgeResponse>
    ) -> thread::JoinHandle<Vec<BridgeRequest>> {
        let socket = ctx.socket(zmq::REP).unwrap();
        socket.bind(endpoint).unwrap();

        thread::spawn(move || {
            let mut requests = Vec::new();
            for response in responses {
                let msg = socket.recv_msg(0).unwrap();
                requests.push(serde_json::from_str(msg.as_str().unwrap()).unwrap());
                socket.send(serde_json::to_string(&response).unwrap().as_str(), 0).unwrap();
            }
            requests
        })
    }

    fn scanner_for(ctx: &zmq::Context, endpoint: &str) -> BridgeScanner {
        BridgeScanner {
            ctx: ctx.clone(),
            params: NetParams {
                bridge_endpoint: endpoint.to_string(),
                ..Default::default()
            }
        }
    }

    #[test]
    fn test_find_and_drive() {
        let ctx = zmq::Context::new();
        let server = serve(&ctx, "inproc://bridge_drive", vec![
            BridgeResponse::Toys { toys: vec![ToyInfo::named("SB-9DD8")] },
            BridgeResponse::Ok,
            BridgeResponse::Ok,
            BridgeResponse::Location { loc: Some(Location { x: 1.0, y: 2.0 }) },
            BridgeResponse::Ok,
        ]);

        let scanner = scanner_for(&ctx, "inproc://bridge_drive");
        let info = scanner.find_toy("SB-9DD8").unwrap();
        let mut toy = scanner.connect(&info).unwrap();
        toy.roll(90, 100, 0.01).unwrap();
        assert_eq!(toy.get_location().unwrap(), Some(Location { x: 1.0, y: 2.0 }));
        toy.disconnect().unwrap();
        assert!(matches!(toy.set_speed(0), Err(ToyError::Disconnected)));

        let requests = server.join().unwrap();
        assert_eq!(requests, vec![
            BridgeRequest::FindToys,
            BridgeRequest::Connect { name: "SB-9DD8".into() },
            BridgeRequest::Roll { heading_deg: 90, speed: 100, duration_s: 0.01 },
            BridgeRequest::GetLocation,
            BridgeRequest::Disconnect,
        ]);
    }

    #[test]
    fn test_connect_rejected() {
        let ctx = zmq::Context::new();
        let server = serve(&ctx, "inproc://bridge_reject", vec![
            BridgeResponse::Error { msg: "toy out of range".into() },
        ]);

        let scanner = scanner_for(&ctx, "inproc://bridge_reject");
        let result = scanner.connect(&ToyInfo::named("SB-7740"));
        assert!(matches!(result, Err(ToyError::ConnectFailed { .. })));

        server.join().unwrap();
    }

    #[test]
    fn test_unsupported_sensor() {
        let ctx = zmq::Context::new();
        let server = serve(&ctx, "inproc://bridge_unsupported", vec![
            BridgeResponse::Ok,
            BridgeResponse::Unsupported,
        ]);

        let scanner = scanner_for(&ctx, "inproc://bridge_unsupported");
        let mut toy = scanner.connect(&ToyInfo::named("SB-2BBE")).unwrap();
        assert!(matches!(toy.reset_locator(), Err(ToyError::Unsupported("reset_locator"))));

        server.join().unwrap();
    }
}
