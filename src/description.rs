use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;

/// SessionDescription is the type-tagged SDP blob exchanged with the remote endpoint.
///
/// It is produced by the transport and passed along verbatim; the SDP body is
/// only parsed when it is handed back to a peer connection.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub sdp_type: RTCSdpType,

    pub sdp: String,
}

impl SessionDescription {
    /// Given SDP representing an offer, wrap it in a SessionDescription
    pub fn offer(sdp: String) -> Self {
        Self {
            sdp_type: RTCSdpType::Offer,
            sdp,
        }
    }

    /// Given SDP representing an answer, wrap it in a SessionDescription
    pub fn answer(sdp: String) -> Self {
        Self {
            sdp_type: RTCSdpType::Answer,
            sdp,
        }
    }

    /// Converts into the peer connection's description type, parsing the SDP body.
    /// Rollback and unspecified descriptions can't be applied by this client.
    pub fn to_rtc(&self) -> Result<RTCSessionDescription> {
        let sdp = self.sdp.clone();
        let desc = match self.sdp_type {
            RTCSdpType::Offer => RTCSessionDescription::offer(sdp)?,
            RTCSdpType::Answer => RTCSessionDescription::answer(sdp)?,
            RTCSdpType::Pranswer => RTCSessionDescription::pranswer(sdp)?,
            other => return Err(Error::ErrUnsupportedSdpType(other)),
        };
        Ok(desc)
    }
}

impl From<RTCSessionDescription> for SessionDescription {
    fn from(desc: RTCSessionDescription) -> Self {
        Self {
            sdp_type: desc.sdp_type,
            sdp: desc.sdp,
        }
    }
}
